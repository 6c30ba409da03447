//! End-to-end feed tests against a local mock server.

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use hazard_pulse::alerts::CommunityAlertFeed;
use hazard_pulse::sources::{HazardSource, SeismicSource, SourceError};
use hazard_pulse::{Aggregator, Coordinate, EngineConfig, EventSource, Severity};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

const REFERENCE: Coordinate = Coordinate {
    latitude: 34.0754,
    longitude: -84.2941,
};

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn usgs(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let expected = [
        ("format", "geojson"),
        ("limit", "25"),
        ("orderby", "time"),
        ("maxradiuskm", "150"),
    ];
    let params_ok = expected
        .iter()
        .all(|(k, v)| params.get(*k).map(String::as_str) == Some(*v))
        && params.contains_key("latitude")
        && params.contains_key("longitude");
    let agent_ok = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        == Some("community-pulse");
    if !params_ok || !agent_ok {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad query" })));
    }

    (
        StatusCode::OK,
        Json(json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "id": "us7000same",
                    "geometry": { "type": "Point", "coordinates": [-84.2941, 34.0754, 5.0] },
                    "properties": {
                        "mag": 6.2,
                        "title": "M 6.2 - Alpharetta",
                        "time": 1760875200000i64
                    }
                },
                {
                    "id": "us7000older",
                    "geometry": { "type": "Point", "coordinates": [-84.0, 34.2, 9.0] },
                    "properties": {
                        "mag": 4.1,
                        "title": "M 4.1 - Cumming",
                        "time": 1760871600000i64
                    }
                }
            ]
        })),
    )
}

async fn eonet() -> Json<Value> {
    Json(json!({
        "events": [
            {
                "id": "EONET_near",
                "title": "Lake Lanier Wildfire",
                "categories": [{ "title": "Wildfires" }],
                "geometry": [{ "date": "2025-10-19T13:00:00Z", "coordinates": [-84.0, 34.2] }]
            },
            {
                "id": "EONET_far",
                "title": "Outer Banks Flooding",
                "categories": [{ "title": "Floods" }],
                "geometry": [{ "date": "2025-10-19T14:00:00Z", "coordinates": [-78.87, 34.0754] }]
            },
            { "id": "EONET_broken", "title": "No geometry" }
        ]
    }))
}

async fn server_error() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

fn config_for(base: &str) -> EngineConfig {
    EngineConfig {
        seismic_endpoint: format!("{}/usgs", base),
        environmental_endpoint: format!("{}/eonet?status=open", base),
        alert_feed: format!("{}/alerts", base),
        source_timeout: Duration::from_secs(5),
        ..EngineConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn aggregates_both_feeds_within_radius() {
    let base = spawn(
        Router::new()
            .route("/usgs", get(usgs))
            .route("/eonet", get(eonet)),
    )
    .await;

    let report = Aggregator::from_config(&config_for(&base))
        .aggregate_report(REFERENCE, 150.0)
        .await
        .unwrap();

    let ids: Vec<_> = report.events.iter().map(|e| e.id.as_str()).collect();
    // 13:00Z wildfire is newest, then the two quakes (12:00Z, 11:00Z).
    assert_eq!(ids, ["EONET_near", "us7000same", "us7000older"]);
    assert!(report.failures.is_empty());
    assert_eq!(report.skipped, 1);
    assert_eq!(report.out_of_radius, 1);
    assert!(report
        .events
        .iter()
        .all(|e| e.distance_km.map_or(true, |d| d <= 150.0)));

    let quake = &report.events[1];
    assert_eq!(quake.source, EventSource::Seismic);
    assert_eq!(quake.severity, Severity::Emergency);
    assert!(quake.distance_km.unwrap() < 1e-6);
    assert_eq!(report.events[0].severity, Severity::Emergency);
    assert_eq!(report.events[2].severity, Severity::Alert);
}

#[tokio::test(flavor = "multi_thread")]
async fn one_failing_feed_is_tolerated() {
    let base = spawn(
        Router::new()
            .route("/usgs", get(server_error))
            .route("/eonet", get(eonet)),
    )
    .await;

    let report = Aggregator::from_config(&config_for(&base))
        .aggregate_report(REFERENCE, 150.0)
        .await
        .unwrap();

    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].source, EventSource::Environmental);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, "USGS");
    assert_eq!(report.failures[0].error, SourceError::Network("HTTP 500".into()));
}

#[tokio::test(flavor = "multi_thread")]
async fn both_feeds_failing_is_aggregate_failure() {
    let base = spawn(
        Router::new()
            .route("/usgs", get(server_error))
            .route("/eonet", get(|| async { "<html>maintenance</html>" })),
    )
    .await;

    let failure = Aggregator::from_config(&config_for(&base))
        .aggregate(REFERENCE, 150.0)
        .await
        .unwrap_err();

    assert_eq!(failure.causes.len(), 2);
    assert!(matches!(failure.causes[0].error, SourceError::Network(_)));
    assert!(matches!(failure.causes[1].error, SourceError::Format(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_endpoint_is_network_error() {
    let source = SeismicSource::new("http://127.0.0.1:9/usgs", "test", Duration::from_secs(1));
    let err = tokio::task::spawn_blocking(move || source.fetch(REFERENCE, 150.0))
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, SourceError::Network(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn alert_feed_http_500_serves_demo_alerts() {
    let base = spawn(Router::new().route("/alerts", get(server_error))).await;
    let feed = CommunityAlertFeed::from_config(&config_for(&base));

    let alerts = tokio::task::spawn_blocking(move || feed.fetch()).await.unwrap();

    let ids: Vec<_> = alerts.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["mock-1", "mock-2", "mock-3"]);
    assert_eq!(alerts[0].headline, "Cooling center open downtown");
    assert_eq!(alerts[1].source, "Public Works");
    assert_eq!(alerts[2].level, Severity::Emergency);
}

#[tokio::test(flavor = "multi_thread")]
async fn alert_feed_live_features() {
    let base = spawn(Router::new().route(
        "/alerts",
        get(|| async {
            Json(json!({
                "features": [{
                    "id": "nws-1",
                    "properties": {
                        "headline": "Tornado Warning",
                        "areaDesc": "Forsyth, GA",
                        "severity": "Extreme",
                        "sent": "2026-10-19T10:00:00Z"
                    }
                }]
            }))
        }),
    ))
    .await;
    let feed = CommunityAlertFeed::from_config(&config_for(&base));

    let alerts = tokio::task::spawn_blocking(move || feed.fetch()).await.unwrap();

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, "nws-1");
    assert_eq!(alerts[0].level, Severity::Emergency);
    assert_eq!(alerts[0].source, "NWS");
}
