//! Platform geolocation backends.

use super::types::GeolocationError;
use crate::config::EngineConfig;
use crate::model::Coordinate;
use serde::Deserialize;
use std::time::Duration;

/// Time allowed for a single platform location fix.
pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// The platform's "where am I" capability.
pub trait Geolocator: Send + Sync {
    fn locate(&self) -> Result<Coordinate, GeolocationError>;
}

/// IP-based geolocation over HTTP (ipapi.co schema).
pub struct IpGeolocator {
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country_name: Option<String>,
    /// Set by ipapi.co when it refuses the lookup (rate limit, reserved range).
    #[serde(default)]
    error: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
}

impl IpGeolocator {
    pub fn new(endpoint: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_agent: user_agent.into(),
            timeout: GEOLOCATION_TIMEOUT,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.geolocation_endpoint.clone(), config.user_agent.clone())
    }
}

impl Geolocator for IpGeolocator {
    fn locate(&self) -> Result<Coordinate, GeolocationError> {
        let response = ureq::get(&self.endpoint)
            .set("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => GeolocationError::Denied(format!("HTTP {}", code)),
                ureq::Error::Transport(t) if t.to_string().contains("timed out") => {
                    GeolocationError::Timeout
                }
                ureq::Error::Transport(t) => GeolocationError::Denied(t.to_string()),
            })?;

        let r: IpApiResult = response
            .into_json()
            .map_err(|e| GeolocationError::Denied(format!("invalid response: {}", e)))?;

        if r.error.unwrap_or(false) {
            return Err(GeolocationError::Denied(
                r.reason.unwrap_or_else(|| "lookup refused".into()),
            ));
        }

        let lat = r.latitude.ok_or_else(|| GeolocationError::Denied("no latitude".into()))?;
        let lon = r.longitude.ok_or_else(|| GeolocationError::Denied("no longitude".into()))?;
        let coordinate = Coordinate::new(lat, lon);
        if !coordinate.is_finite() || !coordinate.in_range() {
            return Err(GeolocationError::InvalidCoordinate);
        }

        tracing::info!(
            city = r.city.as_deref().unwrap_or("unknown"),
            country = r.country_name.as_deref().unwrap_or("unknown"),
            "located via IP"
        );
        Ok(coordinate)
    }
}

/// Geolocation disabled (offline mode): always `Unsupported`.
pub struct DisabledGeolocator;

impl Geolocator for DisabledGeolocator {
    fn locate(&self) -> Result<Coordinate, GeolocationError> {
        Err(GeolocationError::Unsupported(
            "geolocation is disabled in offline mode".into(),
        ))
    }
}
