mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::aggregator::Aggregator;
use crate::alerts::CommunityAlertFeed;
use crate::config::EngineConfig;
use crate::location::LocationProvider;

pub use handlers::DEFAULT_RADIUS_KM;
pub use state::AppState;

pub fn build_router(config: &EngineConfig, location: Arc<LocationProvider>) -> Router {
    let state = Arc::new(AppState {
        aggregator: Aggregator::from_config(config),
        alerts: CommunityAlertFeed::from_config(config),
        location,
    });

    Router::new()
        .route("/api/hazards", get(handlers::hazards))
        .route("/api/alerts", get(handlers::alerts))
        .route(
            "/api/location",
            get(handlers::location).post(handlers::set_location),
        )
        .route("/api/location/request", post(handlers::request_location))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, config: &EngineConfig, location: Arc<LocationProvider>) {
    let app = build_router(config, location);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: Cannot bind to {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!(%addr, "hazard pulse server listening");
    eprintln!("  Hazard Pulse server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Server error: {}", e);
            std::process::exit(1);
        });
}
