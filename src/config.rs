//! Engine configuration: endpoints, identification, timeouts and the cache path.
//!
//! Defaults target the public feeds. Every field can be overridden through a
//! `HAZARD_PULSE_*` environment variable, then by CLI flags.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SEISMIC_ENDPOINT: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";
pub const DEFAULT_ENVIRONMENTAL_ENDPOINT: &str =
    "https://eonet.gsfc.nasa.gov/api/v3/events?status=open";
pub const DEFAULT_ALERT_FEED: &str =
    "https://api.weather.gov/alerts/active?status=actual&message_type=alert";
pub const DEFAULT_GEOLOCATION_ENDPOINT: &str = "https://ipapi.co/json/";
pub const DEFAULT_USER_AGENT: &str = "community-pulse";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub seismic_endpoint: String,
    pub environmental_endpoint: String,
    pub alert_feed: String,
    pub geolocation_endpoint: String,
    pub user_agent: String,
    /// Deadline for each hazard source, also passed to the HTTP client.
    pub source_timeout: Duration,
    pub cache_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seismic_endpoint: DEFAULT_SEISMIC_ENDPOINT.into(),
            environmental_endpoint: DEFAULT_ENVIRONMENTAL_ENDPOINT.into(),
            alert_feed: DEFAULT_ALERT_FEED.into(),
            geolocation_endpoint: DEFAULT_GEOLOCATION_ENDPOINT.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            source_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_path: default_cache_path(),
        }
    }
}

impl EngineConfig {
    /// Defaults with `HAZARD_PULSE_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HAZARD_PULSE_SEISMIC_ENDPOINT") {
            config.seismic_endpoint = v;
        }
        if let Some(v) = get("HAZARD_PULSE_ENVIRONMENTAL_ENDPOINT") {
            config.environmental_endpoint = v;
        }
        if let Some(v) = get("HAZARD_PULSE_ALERT_FEED") {
            config.alert_feed = v;
        }
        if let Some(v) = get("HAZARD_PULSE_GEOLOCATION_ENDPOINT") {
            config.geolocation_endpoint = v;
        }
        if let Some(v) = get("HAZARD_PULSE_USER_AGENT") {
            config.user_agent = v;
        }
        if let Some(v) = get("HAZARD_PULSE_TIMEOUT_SECS") {
            match v.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.source_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %v, "ignoring invalid HAZARD_PULSE_TIMEOUT_SECS"),
            }
        }
        if let Some(v) = get("HAZARD_PULSE_CACHE") {
            config.cache_path = PathBuf::from(v);
        }
        config
    }
}

fn default_cache_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hazard-pulse")
        .join("location.json")
}
