//! Source-specific severity heuristics.
//!
//! Each feed exposes a different raw signal: USGS a numeric magnitude, EONET a
//! category label, NWS a textual severity. All three collapse into [`Severity`].

use crate::model::Severity;

pub const EMERGENCY_MAGNITUDE: f64 = 6.0;
pub const ALERT_MAGNITUDE: f64 = 4.0;

const EMERGENCY_CATEGORIES: &[&str] = &["wildfire", "volcano", "severe storms"];
const ALERT_CATEGORIES: &[&str] = &["earthquake", "floods", "hurricanes"];

/// Classify a seismic magnitude. Absent or NaN is `Info`.
pub fn from_magnitude(magnitude: Option<f64>) -> Severity {
    match magnitude {
        Some(m) if m >= EMERGENCY_MAGNITUDE => Severity::Emergency,
        Some(m) if m >= ALERT_MAGNITUDE => Severity::Alert,
        _ => Severity::Info,
    }
}

/// Classify an environmental category label by keyword.
///
/// Emergency keywords are checked before alert keywords, so a label carrying
/// both ("Wildfire and Floods") is an emergency.
pub fn from_category_label(label: Option<&str>) -> Severity {
    let Some(label) = label else {
        return Severity::Info;
    };
    let normalized = label.to_lowercase();
    if EMERGENCY_CATEGORIES.iter().any(|k| normalized.contains(k)) {
        Severity::Emergency
    } else if ALERT_CATEGORIES.iter().any(|k| normalized.contains(k)) {
        Severity::Alert
    } else {
        Severity::Info
    }
}

/// Classify an alert feed's textual severity ("Extreme", "Severe", "Moderate", ...).
pub fn from_alert_level(level: Option<&str>) -> Severity {
    match level.map(|l| l.trim().to_lowercase()).as_deref() {
        Some("extreme") | Some("severe") => Severity::Emergency,
        Some("moderate") => Severity::Alert,
        _ => Severity::Info,
    }
}
