//! Community alert feed with a built-in demonstration fallback.
//!
//! Unlike the hazard sources this feed never fails: an unreachable endpoint, a
//! non-2xx status, an unparseable body or an empty feature list all yield the
//! three demonstration alerts from [`demo_alerts`].

use crate::config::EngineConfig;
use crate::model::{CommunityAlert, Severity};
use crate::severity;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Maximum number of alerts taken from a live feed.
pub const ALERT_FEED_LIMIT: usize = 20;

#[derive(Deserialize)]
struct AlertCollection {
    #[serde(default)]
    features: Option<Vec<AlertFeature>>,
}

#[derive(Deserialize)]
struct AlertFeature {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: AlertProperties,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AlertProperties {
    headline: Option<String>,
    event: Option<String>,
    description: Option<String>,
    instruction: Option<String>,
    area_desc: Option<String>,
    sent: Option<String>,
    effective: Option<String>,
    sender_name: Option<String>,
    severity: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommunityAlertFeed {
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

impl CommunityAlertFeed {
    pub fn new(
        endpoint: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_agent: user_agent.into(),
            timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.alert_feed.clone(),
            config.user_agent.clone(),
            config.source_timeout,
        )
    }

    /// Live alerts, or the demonstration set when the feed has nothing usable.
    pub fn fetch(&self) -> Vec<CommunityAlert> {
        let now = Utc::now();
        match self.fetch_live(now) {
            Some(alerts) => alerts,
            None => {
                tracing::info!(
                    endpoint = %self.endpoint,
                    "alert feed unavailable, serving demonstration alerts"
                );
                demo_alerts(now)
            }
        }
    }

    fn fetch_live(&self, now: DateTime<Utc>) -> Option<Vec<CommunityAlert>> {
        let response = ureq::get(&self.endpoint)
            .set("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .call()
            .map_err(|e| tracing::debug!(error = %e, "alert feed request failed"))
            .ok()?;
        let body = response
            .into_string()
            .map_err(|e| tracing::debug!(error = %e, "alert feed body unreadable"))
            .ok()?;
        parse_alerts(&body, now)
    }
}

/// Map an alert feed body. `None` means "use the fallback".
pub fn parse_alerts(body: &str, now: DateTime<Utc>) -> Option<Vec<CommunityAlert>> {
    if body.trim().is_empty() {
        return None;
    }
    let collection: AlertCollection = serde_json::from_str(body)
        .map_err(|e| tracing::debug!(error = %e, "alert feed body is not an alert collection"))
        .ok()?;
    let features = collection.features.unwrap_or_default();
    if features.is_empty() {
        return None;
    }

    Some(
        features
            .into_iter()
            .take(ALERT_FEED_LIMIT)
            .enumerate()
            .map(|(i, f)| map_alert(f, i, now))
            .collect(),
    )
}

fn map_alert(feature: AlertFeature, index: usize, now: DateTime<Utc>) -> CommunityAlert {
    let p = feature.properties;
    let updated = p
        .sent
        .as_deref()
        .or(p.effective.as_deref())
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(now);

    CommunityAlert {
        id: feature.id.unwrap_or_else(|| format!("alert-{}", index + 1)),
        headline: p
            .headline
            .or(p.event)
            .unwrap_or_else(|| "Community alert".into()),
        description: p
            .description
            .or(p.instruction)
            .unwrap_or_else(|| "Stay tuned for additional information.".into()),
        area: p.area_desc.unwrap_or_else(|| "Local area".into()),
        updated,
        source: p.sender_name.unwrap_or_else(|| "NWS".into()),
        level: severity::from_alert_level(p.severity.as_deref()),
    }
}

/// The fixed demonstration set served when the live feed is unusable.
pub fn demo_alerts(now: DateTime<Utc>) -> Vec<CommunityAlert> {
    vec![
        CommunityAlert {
            id: "mock-1".into(),
            headline: "Cooling center open downtown".into(),
            description: "City has activated the downtown wellness center with 150 beds, \
                          cold water, and translation services."
                .into(),
            area: "Downtown core".into(),
            updated: now,
            source: "City Resilience Office".into(),
            level: Severity::Info,
        },
        CommunityAlert {
            id: "mock-2".into(),
            headline: "Road closure near riverfront".into(),
            description: "North River Drive is closed due to high water. \
                          Use 8th Avenue as a detour."
                .into(),
            area: "Riverfront district".into(),
            updated: now - ChronoDuration::minutes(45),
            source: "Public Works".into(),
            level: Severity::Alert,
        },
        CommunityAlert {
            id: "mock-3".into(),
            headline: "Shelter activated at East High".into(),
            description: "Severe storms expected tonight. East High gym is open as an overnight \
                          shelter with medical staff on site."
                .into(),
            area: "Eastborough".into(),
            updated: now - ChronoDuration::minutes(90),
            source: "Emergency Management".into(),
            level: Severity::Emergency,
        },
    ]
}

/// Keep alerts at exactly `level`; `None` keeps everything.
pub fn filter_by_level(
    alerts: Vec<CommunityAlert>,
    level: Option<Severity>,
) -> Vec<CommunityAlert> {
    match level {
        None => alerts,
        Some(level) => alerts.into_iter().filter(|a| a.level == level).collect(),
    }
}
