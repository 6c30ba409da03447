//! Reference-point resolution for hazard queries.
//!
//! Platform geolocation with a persisted last-known fallback, or manual entry.

pub mod cache;
pub mod geolocator;
pub mod provider;
pub mod types;

pub use cache::{LastLocationCache, STORAGE_KEY};
pub use geolocator::{DisabledGeolocator, Geolocator, IpGeolocator};
pub use provider::LocationProvider;
pub use types::{GeolocationError, LocationSnapshot, LocationState, RequestOutcome};
