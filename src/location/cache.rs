//! Single-slot last-known location cache at ~/.hazard-pulse/location.json.
//!
//! Holds exactly one coordinate under a fixed key. Every write overwrites it;
//! there is no expiry. A missing or unreadable file reads as empty.

use crate::model::Coordinate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const STORAGE_KEY: &str = "hazard-pulse:last-location";

#[derive(Serialize, Deserialize, Clone)]
struct CacheEntry {
    latitude: f64,
    longitude: f64,
    /// Epoch milliseconds of the write. Informational only.
    #[serde(default)]
    saved_at: i64,
}

pub struct LastLocationCache {
    path: PathBuf,
}

impl LastLocationCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Option<HashMap<String, CacheEntry>> {
        let data = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&data).ok()
    }

    /// The stored coordinate, if any.
    pub fn get(&self) -> Option<Coordinate> {
        let entries = self.read_file()?;
        let entry = entries.get(STORAGE_KEY)?;
        let c = Coordinate::new(entry.latitude, entry.longitude);
        c.is_finite().then_some(c)
    }

    /// Replace the stored coordinate and persist to disk.
    pub fn put(&self, coordinate: Coordinate) -> io::Result<()> {
        let mut entries = HashMap::new();
        entries.insert(
            STORAGE_KEY.to_string(),
            CacheEntry {
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
                saved_at: chrono::Utc::now().timestamp_millis(),
            },
        );
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, json)
    }
}
