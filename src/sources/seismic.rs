//! USGS FDSN event service adapter.
//!
//! The service filters by radius server-side; distance is still recomputed for
//! every feature and anything beyond the radius is dropped.

use super::{get_json, lon_lat, HazardSource, SourceBatch, SourceError};
use crate::config::EngineConfig;
use crate::geo;
use crate::model::{Coordinate, EventSource, HazardEvent};
use crate::severity;
use chrono::DateTime;
use serde::Deserialize;
use std::time::Duration;

/// Fixed page size; the feed is not paginated.
pub const SEISMIC_EVENT_LIMIT: usize = 25;

const DEFAULT_TITLE: &str = "Earthquake";
const DEFAULT_DESCRIPTION: &str = "Nearby seismic activity detected.";

/// Features stay untyped so one bad record cannot fail the whole collection.
#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<Properties>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: serde_json::Value,
}

#[derive(Deserialize, Default)]
struct Properties {
    #[serde(default)]
    mag: Option<f64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    place: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    time: Option<i64>,
}

pub struct SeismicSource {
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

impl SeismicSource {
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
            config.seismic_endpoint.clone(),
            config.user_agent.clone(),
            config.source_timeout,
        )
    }
}

impl HazardSource for SeismicSource {
    fn kind(&self) -> EventSource {
        EventSource::Seismic
    }

    fn name(&self) -> &str {
        "USGS"
    }

    fn fetch(&self, reference: Coordinate, radius_km: f64) -> Result<SourceBatch, SourceError> {
        let request = ureq::get(&self.endpoint)
            .set("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .query("format", "geojson")
            .query("latitude", &reference.latitude.to_string())
            .query("longitude", &reference.longitude.to_string())
            .query("maxradiuskm", &radius_km.to_string())
            .query("limit", &SEISMIC_EVENT_LIMIT.to_string())
            .query("orderby", "time");

        let collection: FeatureCollection = get_json(request)?;
        let batch = map_collection(collection, reference, radius_km);
        tracing::debug!(
            source = self.name(),
            events = batch.events.len(),
            skipped = batch.skipped,
            out_of_radius = batch.out_of_radius,
            "seismic batch mapped"
        );
        Ok(batch)
    }
}

/// Map a raw GeoJSON feature collection body. Exposed for offline use and tests.
pub fn parse_feed(
    body: &str,
    reference: Coordinate,
    radius_km: f64,
) -> Result<SourceBatch, SourceError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| SourceError::Format(e.to_string()))?;
    Ok(map_collection(collection, reference, radius_km))
}

fn map_collection(
    collection: FeatureCollection,
    reference: Coordinate,
    radius_km: f64,
) -> SourceBatch {
    let mut batch = SourceBatch::default();
    for raw in collection.features.unwrap_or_default() {
        let feature = match serde_json::from_value::<Feature>(raw) {
            Ok(feature) => feature,
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable seismic feature");
                batch.skipped += 1;
                continue;
            }
        };
        match map_feature(feature, reference) {
            Some(event) => batch.push_within(event, radius_km),
            None => batch.skipped += 1,
        }
    }
    batch
}

fn map_feature(feature: Feature, reference: Coordinate) -> Option<HazardEvent> {
    let id = feature.id.filter(|id| !id.is_empty())?;
    let coordinates = lon_lat(&feature.geometry?.coordinates)?;
    let props = feature.properties.unwrap_or_default();
    let timestamp = DateTime::from_timestamp_millis(props.time?)?;

    let magnitude = props.mag.filter(|m| m.is_finite());

    Some(HazardEvent {
        id,
        title: props.title.unwrap_or_else(|| DEFAULT_TITLE.into()),
        description: props.place.unwrap_or_else(|| DEFAULT_DESCRIPTION.into()),
        source: EventSource::Seismic,
        coordinates,
        distance_km: Some(geo::distance(reference, coordinates)),
        magnitude: magnitude.map(|m| format!("{:.1}", m)),
        severity: severity::from_magnitude(magnitude),
        timestamp,
    })
}
