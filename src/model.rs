//! Unified data model shared by every hazard source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Latitude within -90..90 and longitude within -180..180.
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Which feed an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSource {
    #[serde(rename = "USGS")]
    Seismic,
    #[serde(rename = "NASA EONET")]
    Environmental,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seismic => write!(f, "USGS"),
            Self::Environmental => write!(f, "NASA EONET"),
        }
    }
}

/// Three-level severity shared by hazard events and community alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Alert,
    Emergency,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Alert => write!(f, "alert"),
            Self::Emergency => write!(f, "emergency"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "alert" => Ok(Self::Alert),
            "emergency" => Ok(Self::Emergency),
            _ => Err(format!(
                "Unknown level '{}'. Use 'info', 'alert' or 'emergency'.",
                s
            )),
        }
    }
}

/// One seismic or environmental occurrence, normalized across feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub source: EventSource,
    pub coordinates: Coordinate,
    /// Great-circle distance from the reference point. `None` means unknown, not zero.
    pub distance_km: Option<f64>,
    /// Display-only: numeric magnitude for seismic events, category label otherwise.
    pub magnitude: Option<String>,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl HazardEvent {
    pub fn within_radius(&self, radius_km: f64) -> bool {
        self.distance_km.map_or(true, |d| d <= radius_km)
    }
}

/// A community alert from the alert feed (or its demonstration fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityAlert {
    pub id: String,
    pub headline: String,
    pub description: String,
    pub area: String,
    pub updated: DateTime<Utc>,
    pub source: String,
    pub level: Severity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Info < Severity::Alert);
        assert!(Severity::Alert < Severity::Emergency);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("EMERGENCY".parse::<Severity>().unwrap(), Severity::Emergency);
        assert_eq!(" alert ".parse::<Severity>().unwrap(), Severity::Alert);
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn test_source_serializes_as_provenance_label() {
        let json = serde_json::to_string(&EventSource::Environmental).unwrap();
        assert_eq!(json, "\"NASA EONET\"");
        let json = serde_json::to_string(&Severity::Alert).unwrap();
        assert_eq!(json, "\"alert\"");
    }

    #[test]
    fn test_coordinate_checks() {
        assert!(Coordinate::new(34.0754, -84.2941).in_range());
        assert!(!Coordinate::new(91.0, 0.0).in_range());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_finite());
    }

    #[test]
    fn test_unknown_distance_is_always_within_radius() {
        let event = HazardEvent {
            id: "x".into(),
            title: "x".into(),
            description: String::new(),
            source: EventSource::Seismic,
            coordinates: Coordinate::new(0.0, 0.0),
            distance_km: None,
            magnitude: None,
            severity: Severity::Info,
            timestamp: Utc::now(),
        };
        assert!(event.within_radius(0.0));
        let near = HazardEvent { distance_km: Some(150.0), ..event.clone() };
        assert!(near.within_radius(150.0));
        let far = HazardEvent { distance_km: Some(150.1), ..event };
        assert!(!far.within_radius(150.0));
    }
}
