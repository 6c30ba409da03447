//! Hazard Pulse: nearby hazard aggregation.
//!
//! Queries a seismic feed (USGS) and an environmental feed (NASA EONET)
//! concurrently, normalizes both into [`model::HazardEvent`], classifies
//! severity, filters by great-circle radius and merges the survivors most
//! recent first. A community alert feed with a demonstration fallback and a
//! persisted last-known location round out the engine.

pub mod aggregator;
pub mod alerts;
pub mod config;
pub mod geo;
pub mod location;
pub mod model;
pub mod server;
pub mod severity;
pub mod sources;

pub use aggregator::{AggregateFailure, Aggregator, HazardReport, SourceFailure};
pub use config::EngineConfig;
pub use model::{CommunityAlert, Coordinate, EventSource, HazardEvent, Severity};
