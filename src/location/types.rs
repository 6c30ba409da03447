//! Core types for the location subsystem.

use crate::model::Coordinate;
use serde::Serialize;
use thiserror::Error;

/// Where the provider stands with respect to platform geolocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LocationState {
    /// No request outstanding. The provider may or may not hold a coordinate.
    Idle,
    /// A platform geolocation request is outstanding.
    Resolving,
    /// The last request was rejected or unsupported.
    Failed { reason: String },
}

/// Result of a `request_location` call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestOutcome {
    Resolved(Coordinate),
    /// Another request was already outstanding; no new platform call was made.
    AlreadyResolving,
}

/// Geolocation failures. These always reach the caller, who should offer
/// manual coordinate entry instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeolocationError {
    #[error("location access denied: {0}")]
    Denied(String),

    #[error("location request timed out")]
    Timeout,

    #[error("geolocation unsupported: {0}")]
    Unsupported(String),

    #[error("coordinate is not a finite latitude/longitude pair")]
    InvalidCoordinate,
}

/// Snapshot served to callers (CLI banner, `/api/location`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSnapshot {
    pub state: LocationState,
    pub coordinate: Option<Coordinate>,
}
