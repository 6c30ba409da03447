//! NASA EONET open-events adapter.
//!
//! EONET has no geo query parameters, so the feed returns every open event on
//! the globe and the radius filter runs entirely here.

use super::{get_json, lon_lat, HazardSource, SourceBatch, SourceError};
use crate::config::EngineConfig;
use crate::geo;
use crate::model::{Coordinate, EventSource, HazardEvent};
use crate::severity;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_DESCRIPTION: &str = "Environmental event";

/// Events stay untyped so one bad record cannot fail the whole list.
#[derive(Deserialize)]
struct EventList {
    #[serde(default)]
    events: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    geometry: Option<Vec<RawGeometry>>,
    #[serde(default)]
    categories: Option<Vec<RawCategory>>,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(default)]
    coordinates: serde_json::Value,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Deserialize)]
struct RawCategory {
    #[serde(default)]
    title: Option<String>,
}

pub struct EnvironmentalSource {
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

impl EnvironmentalSource {
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
            config.environmental_endpoint.clone(),
            config.user_agent.clone(),
            config.source_timeout,
        )
    }
}

impl HazardSource for EnvironmentalSource {
    fn kind(&self) -> EventSource {
        EventSource::Environmental
    }

    fn name(&self) -> &str {
        "NASA EONET"
    }

    fn fetch(&self, reference: Coordinate, radius_km: f64) -> Result<SourceBatch, SourceError> {
        let request = ureq::get(&self.endpoint)
            .set("User-Agent", &self.user_agent)
            .timeout(self.timeout);

        let list: EventList = get_json(request)?;
        let batch = map_events(list, reference, radius_km, Utc::now());
        tracing::debug!(
            source = self.name(),
            events = batch.events.len(),
            skipped = batch.skipped,
            out_of_radius = batch.out_of_radius,
            "environmental batch mapped"
        );
        Ok(batch)
    }
}

/// Map a raw EONET event list body. `fetched_at` stands in for events without a date.
pub fn parse_feed(
    body: &str,
    reference: Coordinate,
    radius_km: f64,
    fetched_at: DateTime<Utc>,
) -> Result<SourceBatch, SourceError> {
    let list: EventList =
        serde_json::from_str(body).map_err(|e| SourceError::Format(e.to_string()))?;
    Ok(map_events(list, reference, radius_km, fetched_at))
}

fn map_events(
    list: EventList,
    reference: Coordinate,
    radius_km: f64,
    fetched_at: DateTime<Utc>,
) -> SourceBatch {
    let mut batch = SourceBatch::default();
    for value in list.events.unwrap_or_default() {
        let raw = match serde_json::from_value::<RawEvent>(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable environmental event");
                batch.skipped += 1;
                continue;
            }
        };
        match map_event(raw, reference, fetched_at) {
            Some(event) => batch.push_within(event, radius_km),
            None => batch.skipped += 1,
        }
    }
    batch
}

fn map_event(
    raw: RawEvent,
    reference: Coordinate,
    fetched_at: DateTime<Utc>,
) -> Option<HazardEvent> {
    let id = raw.id.filter(|id| !id.is_empty())?;
    let geometry = raw.geometry?.into_iter().next()?;
    let coordinates = lon_lat(&geometry.coordinates)?;

    let category = raw
        .categories
        .and_then(|cats| cats.into_iter().next())
        .and_then(|c| c.title)
        .filter(|t| !t.is_empty());

    let description = raw
        .description
        .filter(|d| !d.is_empty())
        .or_else(|| category.clone())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.into());

    let timestamp = geometry
        .date
        .as_deref()
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(fetched_at);

    Some(HazardEvent {
        id,
        title: raw.title.unwrap_or_else(|| DEFAULT_DESCRIPTION.into()),
        description,
        source: EventSource::Environmental,
        coordinates,
        distance_km: Some(geo::distance(reference, coordinates)),
        severity: severity::from_category_label(category.as_deref()),
        magnitude: category,
        timestamp,
    })
}
