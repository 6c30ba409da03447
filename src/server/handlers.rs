use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::aggregator::SourceFailure;
use crate::alerts::filter_by_level;
use crate::location::{GeolocationError, LocationSnapshot, RequestOutcome};
use crate::model::{CommunityAlert, Coordinate, HazardEvent, Severity};

use super::state::AppState;

pub const DEFAULT_RADIUS_KM: f64 = 150.0;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

impl From<GeolocationError> for ApiError {
    fn from(e: GeolocationError) -> Self {
        let status = match e {
            GeolocationError::InvalidCoordinate => StatusCode::BAD_REQUEST,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };
        api_error(status, format!("{}. Enter coordinates manually instead.", e))
    }
}

fn validate(c: Coordinate) -> Result<Coordinate, ApiError> {
    if !c.is_finite() || !c.in_range() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Invalid coordinates. Lat: -90..90, Lon: -180..180",
        ));
    }
    Ok(c)
}

// ─── GET /api/hazards ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct HazardQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct HazardResponse {
    pub reference: Coordinate,
    pub radius_km: f64,
    pub events: Vec<HazardEvent>,
    pub failures: Vec<SourceFailure>,
    pub skipped: usize,
    pub out_of_radius: usize,
}

pub async fn hazards(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HazardQuery>,
) -> Result<Json<HazardResponse>, ApiError> {
    let start = Instant::now();

    let reference = match (params.lat, params.lon) {
        (Some(lat), Some(lon)) => validate(Coordinate::new(lat, lon))?,
        (None, None) => state.location.coordinate().ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                "No location available. Provide 'lat'+'lon' or set one via /api/location",
            )
        })?,
        _ => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "Provide both 'lat' and 'lon' parameters",
            ))
        }
    };

    let radius_km = params.radius.unwrap_or(DEFAULT_RADIUS_KM);
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(api_error(StatusCode::BAD_REQUEST, "Radius must be a positive number of km"));
    }

    let report = state
        .aggregator
        .aggregate_report(reference, radius_km)
        .await
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e.to_string()))?;

    tracing::info!(
        lat = reference.latitude,
        lon = reference.longitude,
        radius_km,
        events = report.events.len(),
        failures = report.failures.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "GET /api/hazards"
    );

    Ok(Json(HazardResponse {
        reference,
        radius_km,
        events: report.events,
        failures: report.failures,
        skipped: report.skipped,
        out_of_radius: report.out_of_radius,
    }))
}

// ─── GET /api/alerts ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AlertQuery {
    pub level: Option<String>,
}

pub async fn alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertQuery>,
) -> Result<Json<Vec<CommunityAlert>>, ApiError> {
    let start = Instant::now();

    let level = match params.level.as_deref() {
        None | Some("all") => None,
        Some(s) => Some(
            s.parse::<Severity>()
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?,
        ),
    };

    let feed = state.alerts.clone();
    let alerts = tokio::task::spawn_blocking(move || feed.fetch())
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let alerts = filter_by_level(alerts, level);

    tracing::info!(
        level = params.level.as_deref().unwrap_or("all"),
        alerts = alerts.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "GET /api/alerts"
    );

    Ok(Json(alerts))
}

// ─── /api/location ───────────────────────────────────────────────

pub async fn location(State(state): State<Arc<AppState>>) -> Json<LocationSnapshot> {
    Json(state.location.snapshot())
}

pub async fn set_location(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Coordinate>,
) -> Result<Json<LocationSnapshot>, ApiError> {
    let coordinate = validate(body)?;
    state.location.set_location(coordinate)?;
    tracing::info!(lat = coordinate.latitude, lon = coordinate.longitude, "POST /api/location");
    Ok(Json(state.location.snapshot()))
}

pub async fn request_location(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let provider = Arc::clone(&state.location);
    let outcome = tokio::task::spawn_blocking(move || provider.request_location())
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;

    let status = match outcome {
        RequestOutcome::Resolved(_) => StatusCode::OK,
        RequestOutcome::AlreadyResolving => StatusCode::ACCEPTED,
    };
    Ok((status, Json(state.location.snapshot())).into_response())
}
