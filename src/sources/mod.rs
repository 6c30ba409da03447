//! Hazard feed adapters.
//!
//! Each adapter performs one blocking HTTP request and maps its feed's native
//! schema into [`HazardEvent`]s. Malformed records are skipped and counted in the
//! returned [`SourceBatch`]; only transport failures and unparseable payloads
//! fail the whole fetch.

pub mod environmental;
pub mod seismic;

pub use environmental::EnvironmentalSource;
pub use seismic::SeismicSource;

use crate::model::{Coordinate, EventSource, HazardEvent};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Why a single source contributed nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected payload: {0}")]
    Format(String),

    #[error("timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

/// One source's successful output plus per-record diagnostics.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub events: Vec<HazardEvent>,
    /// Records dropped because they did not decode or lacked usable geometry, id or timestamp.
    pub skipped: usize,
    /// Records dropped by the radius filter.
    pub out_of_radius: usize,
}

impl SourceBatch {
    /// Keep `event` only if it lies within `radius_km`.
    pub(crate) fn push_within(&mut self, event: HazardEvent, radius_km: f64) {
        if event.within_radius(radius_km) {
            self.events.push(event);
        } else {
            self.out_of_radius += 1;
        }
    }
}

/// A feed that can be queried for hazards around a reference point.
pub trait HazardSource: Send + Sync {
    fn kind(&self) -> EventSource;

    fn name(&self) -> &str;

    fn fetch(&self, reference: Coordinate, radius_km: f64) -> Result<SourceBatch, SourceError>;
}

/// Send a request and decode its JSON body.
///
/// Non-2xx statuses and transport failures are `Network`; a body that does not
/// decode into `T` is `Format`.
pub(crate) fn get_json<T: DeserializeOwned>(request: ureq::Request) -> Result<T, SourceError> {
    let response = request.call().map_err(|e| match e {
        ureq::Error::Status(code, _) => SourceError::Network(format!("HTTP {}", code)),
        ureq::Error::Transport(t) => SourceError::Network(t.to_string()),
    })?;
    response
        .into_json()
        .map_err(|e| SourceError::Format(e.to_string()))
}

/// Read a GeoJSON-style `[lon, lat, ...]` position.
///
/// Returns `None` for anything that is not an array starting with two finite
/// numbers (polygons, nulls, strings).
pub(crate) fn lon_lat(value: &serde_json::Value) -> Option<Coordinate> {
    let position = value.as_array()?;
    let lon = position.first()?.as_f64()?;
    let lat = position.get(1)?.as_f64()?;
    let c = Coordinate::new(lat, lon);
    c.is_finite().then_some(c)
}
