//! Location provider: the Idle / Resolving / Failed state machine.
//!
//! Start:   cache → seed coordinate (stays Idle)
//! Request: Idle|Failed → Resolving → Idle(coordinate, persisted) | Failed(reason)
//! Manual:  any state → Idle(coordinate, persisted)
//!
//! A manual entry made while a request is outstanding wins: the platform result
//! that arrives afterwards, success or failure, leaves the state alone.

use super::cache::LastLocationCache;
use super::geolocator::Geolocator;
use super::types::{GeolocationError, LocationSnapshot, LocationState, RequestOutcome};
use crate::model::Coordinate;
use std::sync::{Mutex, MutexGuard};

struct Inner {
    state: LocationState,
    coordinate: Option<Coordinate>,
    /// Set while a platform call is outstanding, even if a manual entry has
    /// since moved the state back to Idle.
    in_flight: bool,
}

pub struct LocationProvider {
    geolocator: Box<dyn Geolocator>,
    cache: LastLocationCache,
    inner: Mutex<Inner>,
}

impl LocationProvider {
    /// Build a provider, seeding the coordinate from the cache if present.
    pub fn new(geolocator: impl Geolocator + 'static, cache: LastLocationCache) -> Self {
        let seeded = cache.get();
        if let Some(c) = seeded {
            tracing::debug!(lat = c.latitude, lon = c.longitude, "seeded location from cache");
        }
        Self {
            geolocator: Box::new(geolocator),
            cache,
            inner: Mutex::new(Inner {
                state: LocationState::Idle,
                coordinate: seeded,
                in_flight: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> LocationState {
        self.lock().state.clone()
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.lock().coordinate
    }

    pub fn snapshot(&self) -> LocationSnapshot {
        let inner = self.lock();
        LocationSnapshot {
            state: inner.state.clone(),
            coordinate: inner.coordinate,
        }
    }

    /// Ask the platform for the current position.
    ///
    /// Blocks for the duration of the platform call. A call made while another
    /// is outstanding returns `AlreadyResolving` immediately.
    pub fn request_location(&self) -> Result<RequestOutcome, GeolocationError> {
        {
            let mut inner = self.lock();
            if inner.in_flight {
                return Ok(RequestOutcome::AlreadyResolving);
            }
            inner.in_flight = true;
            inner.state = LocationState::Resolving;
        }

        let result = self.geolocator.locate().and_then(|c| {
            if c.is_finite() {
                Ok(c)
            } else {
                Err(GeolocationError::InvalidCoordinate)
            }
        });

        let mut inner = self.lock();
        inner.in_flight = false;
        match result {
            Ok(coordinate) => {
                if inner.state != LocationState::Resolving {
                    tracing::info!("location resolved after a manual entry, keeping manual entry");
                    return Ok(RequestOutcome::Resolved(inner.coordinate.unwrap_or(coordinate)));
                }
                self.commit(&mut inner, coordinate);
                tracing::info!(
                    lat = coordinate.latitude,
                    lon = coordinate.longitude,
                    "location resolved"
                );
                Ok(RequestOutcome::Resolved(coordinate))
            }
            Err(e) => {
                if inner.state == LocationState::Resolving {
                    inner.state = LocationState::Failed { reason: e.to_string() };
                }
                tracing::info!(error = %e, "location request failed");
                Err(e)
            }
        }
    }

    /// Manual override; accepted in any state.
    pub fn set_location(&self, coordinate: Coordinate) -> Result<(), GeolocationError> {
        if !coordinate.is_finite() {
            return Err(GeolocationError::InvalidCoordinate);
        }
        let mut inner = self.lock();
        self.commit(&mut inner, coordinate);
        Ok(())
    }

    /// Move to Idle with `coordinate` and persist it. Runs under the state lock.
    fn commit(&self, inner: &mut Inner, coordinate: Coordinate) {
        inner.state = LocationState::Idle;
        inner.coordinate = Some(coordinate);
        if let Err(e) = self.cache.put(coordinate) {
            tracing::warn!(
                path = %self.cache.path().display(),
                error = %e,
                "could not persist location"
            );
        }
    }
}
