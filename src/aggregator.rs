//! Concurrent fan-out over every registered hazard source.
//!
//! Each source runs on its own blocking task under its own deadline. A failing
//! or slow source only removes its own contribution; the call as a whole fails
//! only when no source succeeds.

use crate::config::EngineConfig;
use crate::model::{Coordinate, EventSource, HazardEvent};
use crate::sources::{
    EnvironmentalSource, HazardSource, SeismicSource, SourceBatch, SourceError,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One source's failure, tagged with the source name and the kind of events it feeds.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub source: String,
    pub kind: EventSource,
    pub error: SourceError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

impl Serialize for SourceFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("SourceFailure", 3)?;
        s.serialize_field("source", &self.source)?;
        s.serialize_field("kind", &self.kind)?;
        s.serialize_field("error", &self.error.to_string())?;
        s.end()
    }
}

/// Every registered source failed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("all {} hazard sources failed: {}", .causes.len(), join_causes(.causes))]
pub struct AggregateFailure {
    pub causes: Vec<SourceFailure>,
}

fn join_causes(causes: &[SourceFailure]) -> String {
    causes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Merged result with the diagnostics the plain event list drops.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HazardReport {
    pub events: Vec<HazardEvent>,
    /// Sources that failed while at least one other succeeded.
    pub failures: Vec<SourceFailure>,
    pub skipped: usize,
    pub out_of_radius: usize,
}

pub struct Aggregator {
    sources: Vec<Arc<dyn HazardSource>>,
    timeout: Duration,
}

impl Aggregator {
    /// An aggregator with no sources; add them with [`Aggregator::with_source`].
    pub fn new(timeout: Duration) -> Self {
        Self {
            sources: Vec::new(),
            timeout,
        }
    }

    /// USGS then EONET, in that invocation order.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.source_timeout)
            .with_source(SeismicSource::from_config(config))
            .with_source(EnvironmentalSource::from_config(config))
    }

    pub fn with_source(mut self, source: impl HazardSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Hazards within `radius_km` of `reference`, most recent first.
    pub async fn aggregate(
        &self,
        reference: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<HazardEvent>, AggregateFailure> {
        self.aggregate_report(reference, radius_km)
            .await
            .map(|report| report.events)
    }

    /// Like [`Aggregator::aggregate`], keeping partial failures and skip counters.
    pub async fn aggregate_report(
        &self,
        reference: Coordinate,
        radius_km: f64,
    ) -> Result<HazardReport, AggregateFailure> {
        // All tasks start here and share one deadline; awaiting them in order
        // never extends another source's budget.
        let deadline = tokio::time::Instant::now() + self.timeout;
        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                tokio::task::spawn_blocking(move || source.fetch(reference, radius_km))
            })
            .collect();

        let mut report = HazardReport::default();
        let mut succeeded = 0usize;

        for (source, handle) in self.sources.iter().zip(handles) {
            let outcome = match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) => Err(SourceError::Network(format!(
                    "source task aborted: {}",
                    join_error
                ))),
                Err(_) => Err(SourceError::Timeout(self.timeout)),
            };

            match outcome {
                Ok(batch) => {
                    succeeded += 1;
                    merge_batch(&mut report, batch);
                }
                Err(error) => {
                    tracing::warn!(
                        source = source.name(),
                        kind = %source.kind(),
                        %error,
                        "hazard source failed"
                    );
                    report.failures.push(SourceFailure {
                        source: source.name().to_string(),
                        kind: source.kind(),
                        error,
                    });
                }
            }
        }

        if succeeded == 0 && !self.sources.is_empty() {
            return Err(AggregateFailure {
                causes: report.failures,
            });
        }

        let before = report.events.len();
        report.events.retain(|e| e.within_radius(radius_km));
        report.out_of_radius += before - report.events.len();

        // Stable: ties keep source invocation order.
        report.events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        tracing::debug!(
            events = report.events.len(),
            failures = report.failures.len(),
            skipped = report.skipped,
            out_of_radius = report.out_of_radius,
            "aggregation complete"
        );
        Ok(report)
    }
}

fn merge_batch(report: &mut HazardReport, batch: SourceBatch) {
    report.skipped += batch.skipped;
    report.out_of_radius += batch.out_of_radius;
    report.events.extend(batch.events);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventSource, Severity};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const REFERENCE: Coordinate = Coordinate {
        latitude: 34.0754,
        longitude: -84.2941,
    };

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, hour, 0, 0).unwrap()
    }

    fn event(id: &str, source: EventSource, hour: u32, distance_km: Option<f64>) -> HazardEvent {
        HazardEvent {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            source,
            coordinates: REFERENCE,
            distance_km,
            magnitude: None,
            severity: Severity::Info,
            timestamp: at(hour),
        }
    }

    struct Stub {
        name: &'static str,
        kind: EventSource,
        outcome: Result<Vec<HazardEvent>, SourceError>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl Stub {
        fn ok(name: &'static str, kind: EventSource, events: Vec<HazardEvent>) -> Self {
            Self {
                name,
                kind,
                outcome: Ok(events),
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(name: &'static str, kind: EventSource, error: SourceError) -> Self {
            Self {
                outcome: Err(error),
                ..Self::ok(name, kind, vec![])
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl HazardSource for Stub {
        fn kind(&self) -> EventSource {
            self.kind
        }

        fn name(&self) -> &str {
            self.name
        }

        fn fetch(
            &self,
            _reference: Coordinate,
            _radius_km: f64,
        ) -> Result<SourceBatch, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.outcome.clone().map(|events| SourceBatch {
                events,
                skipped: 1,
                out_of_radius: 0,
            })
        }
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_merges_and_sorts_most_recent_first() {
        let agg = aggregator()
            .with_source(Stub::ok(
                "USGS",
                EventSource::Seismic,
                vec![
                    event("q1", EventSource::Seismic, 3, Some(10.0)),
                    event("q2", EventSource::Seismic, 9, Some(20.0)),
                ],
            ))
            .with_source(Stub::ok(
                "NASA EONET",
                EventSource::Environmental,
                vec![event("e1", EventSource::Environmental, 6, Some(30.0))],
            ));

        let report = agg.aggregate_report(REFERENCE, 150.0).await.unwrap();
        let ids: Vec<_> = report.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["q2", "e1", "q1"]);
        assert_eq!(report.skipped, 2);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_ties_keep_invocation_order() {
        let agg = aggregator()
            .with_source(Stub::ok(
                "USGS",
                EventSource::Seismic,
                vec![event("seismic", EventSource::Seismic, 5, Some(1.0))],
            ))
            .with_source(Stub::ok(
                "NASA EONET",
                EventSource::Environmental,
                vec![event("environmental", EventSource::Environmental, 5, Some(1.0))],
            ));

        for _ in 0..5 {
            let events = agg.aggregate(REFERENCE, 150.0).await.unwrap();
            assert_eq!(events[0].id, "seismic");
            assert_eq!(events[1].id, "environmental");
        }
    }

    #[tokio::test]
    async fn test_duplicates_across_sources_are_kept() {
        let agg = aggregator()
            .with_source(Stub::ok(
                "USGS",
                EventSource::Seismic,
                vec![event("same", EventSource::Seismic, 5, Some(1.0))],
            ))
            .with_source(Stub::ok(
                "NASA EONET",
                EventSource::Environmental,
                vec![event("same", EventSource::Environmental, 5, Some(1.0))],
            ));
        let events = agg.aggregate(REFERENCE, 150.0).await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_one_failure_keeps_other_source() {
        let agg = aggregator()
            .with_source(Stub::failing(
                "USGS",
                EventSource::Seismic,
                SourceError::Network("HTTP 503".into()),
            ))
            .with_source(Stub::ok(
                "NASA EONET",
                EventSource::Environmental,
                vec![event("e1", EventSource::Environmental, 6, Some(30.0))],
            ));

        let report = agg.aggregate_report(REFERENCE, 150.0).await.unwrap();
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].source, EventSource::Environmental);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source, "USGS");
        assert_eq!(report.failures[0].kind, EventSource::Seismic);
    }

    #[tokio::test]
    async fn test_all_failures_raise_aggregate_failure() {
        let agg = aggregator()
            .with_source(Stub::failing(
                "USGS",
                EventSource::Seismic,
                SourceError::Network("HTTP 500".into()),
            ))
            .with_source(Stub::failing(
                "NASA EONET",
                EventSource::Environmental,
                SourceError::Format("expected object".into()),
            ));

        let failure = agg.aggregate(REFERENCE, 150.0).await.unwrap_err();
        assert_eq!(failure.causes.len(), 2);
        assert_eq!(failure.causes[0].source, "USGS");
        assert_eq!(failure.causes[1].error, SourceError::Format("expected object".into()));
        let message = failure.to_string();
        assert!(message.starts_with("all 2 hazard sources failed"));
        assert!(message.contains("USGS: network error: HTTP 500"));
    }

    #[tokio::test]
    async fn test_empty_success_is_not_a_failure() {
        let agg = aggregator()
            .with_source(Stub::ok("USGS", EventSource::Seismic, vec![]))
            .with_source(Stub::failing(
                "NASA EONET",
                EventSource::Environmental,
                SourceError::Network("refused".into()),
            ));
        assert!(agg.aggregate(REFERENCE, 150.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_sources_yields_empty_list() {
        assert!(aggregator().aggregate(REFERENCE, 150.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_radius_guard_applies_to_every_source() {
        let agg = aggregator().with_source(Stub::ok(
            "custom",
            EventSource::Environmental,
            vec![
                event("inside", EventSource::Environmental, 1, Some(149.9)),
                event("outside", EventSource::Environmental, 2, Some(500.0)),
                event("unknown", EventSource::Environmental, 3, None),
            ],
        ));
        let report = agg.aggregate_report(REFERENCE, 150.0).await.unwrap();
        let ids: Vec<_> = report.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["unknown", "inside"]);
        assert_eq!(report.out_of_radius, 1);
        assert!(report
            .events
            .iter()
            .all(|e| e.distance_km.map_or(true, |d| d <= 150.0)));
    }

    #[tokio::test]
    async fn test_slow_source_times_out_without_blocking_other() {
        let fast = Stub::ok(
            "fast",
            EventSource::Environmental,
            vec![event("e1", EventSource::Environmental, 6, Some(30.0))],
        );
        let fast_calls = Arc::clone(&fast.calls);
        let agg = Aggregator::new(Duration::from_millis(100))
            .with_source(
                Stub::ok("slow", EventSource::Seismic, vec![]).slow(Duration::from_millis(800)),
            )
            .with_source(fast);

        let started = std::time::Instant::now();
        let report = agg.aggregate_report(REFERENCE, 150.0).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(700));
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures[0].error,
            SourceError::Timeout(Duration::from_millis(100))
        );
        assert_eq!(fast_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_from_config_registers_usgs_then_eonet() {
        let agg = Aggregator::from_config(&EngineConfig::default());
        assert_eq!(agg.source_names(), ["USGS", "NASA EONET"]);
    }

    #[test]
    fn test_failure_serializes_kind_and_message() {
        let failure = SourceFailure {
            source: "NASA EONET".into(),
            kind: EventSource::Environmental,
            error: SourceError::Format("expected object".into()),
        };
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["source"], "NASA EONET");
        assert_eq!(value["kind"], "NASA EONET");
        assert_eq!(value["error"], "unexpected payload: expected object");
    }
}
