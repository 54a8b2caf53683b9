//! Persistent distance memo.
//!
//! An append-only CSV table (`route,distance`) keyed by the unordered pair
//! of normalized addresses. The whole file is loaded at open; appends go
//! straight to disk and are never compacted. Single writer assumed.

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("distance cache I/O at {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("distance cache rows at {path:?}: {source}")]
    Rows { path: PathBuf, source: csv::Error },
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    route: String,
    distance: f64,
}

/// Canonical unordered-pair key: lexicographic ordering makes `(a, b)` and
/// `(b, a)` identical.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}|{b}")
    } else {
        format!("{b}|{a}")
    }
}

pub struct DistanceCache {
    path: PathBuf,
    entries: HashMap<String, f64>,
}

impl DistanceCache {
    /// Open the cache, creating an empty table (and parent directories) when
    /// none exists yet. Duplicate routes keep their first recorded distance.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                    path: path.clone(),
                    source,
                })?;
            }
            std::fs::write(&path, "route,distance\n").map_err(|source| CacheError::Io {
                path: path.clone(),
                source,
            })?;
            debug!("Created distance cache at {:?}", path);
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .map_err(|source| CacheError::Rows {
                path: path.clone(),
                source,
            })?;

        let mut entries = HashMap::new();
        for record in reader.deserialize::<CacheRecord>() {
            let rec = record.map_err(|source| CacheError::Rows {
                path: path.clone(),
                source,
            })?;
            entries.entry(rec.route).or_insert(rec.distance);
        }

        debug!("Distance cache {:?}: {} entries", path, entries.len());
        Ok(Self { path, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// Record a distance under its canonical key. The log only ever grows;
    /// a duplicate route appended here loses to the original on reload.
    pub fn insert(&mut self, key: String, distance: f64) -> Result<(), CacheError> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| CacheError::Io {
                path: self.path.clone(),
                source,
            })?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .serialize(CacheRecord {
                route: key.clone(),
                distance,
            })
            .map_err(|source| CacheError::Rows {
                path: self.path.clone(),
                source,
            })?;
        writer.flush().map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;

        self.entries.entry(key).or_insert(distance);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_ignores_argument_order() {
        assert_eq!(pair_key("b", "a"), pair_key("a", "b"));
        assert_eq!(pair_key("a", "b"), "a|b");
        assert_eq!(pair_key("3531JB", "Utrecht Centraal Station"), "3531JB|Utrecht Centraal Station");
    }

    #[test]
    fn open_creates_missing_table_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache_distances_data.csv");

        let cache = DistanceCache::open(&path).unwrap();
        assert!(cache.is_empty());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "route,distance\n");
    }

    #[test]
    fn entries_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.csv");

        let key = pair_key("9726AE", "Utrecht Centraal Station");
        {
            let mut cache = DistanceCache::open(&path).unwrap();
            cache.insert(key.clone(), 158.93).unwrap();
        }

        let reopened = DistanceCache::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(&key), Some(158.93));
    }

    #[test]
    fn first_duplicate_wins_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.csv");
        std::fs::write(&path, "route,distance\na|b,1.5\na|b,9.9\n").unwrap();

        let cache = DistanceCache::open(&path).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a|b"), Some(1.5));
    }

    #[test]
    fn inserts_append_instead_of_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.csv");

        let mut cache = DistanceCache::open(&path).unwrap();
        cache.insert(pair_key("a", "b"), 1.0).unwrap();
        cache.insert(pair_key("c", "d"), 2.0).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "route,distance");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn commas_in_addresses_survive_the_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.csv");

        let key = pair_key("9726AE, Groningen", "Utrecht Centraal Station");
        {
            let mut cache = DistanceCache::open(&path).unwrap();
            cache.insert(key.clone(), 12.34).unwrap();
        }

        let reopened = DistanceCache::open(&path).unwrap();
        assert_eq!(reopened.get(&key), Some(12.34));
    }
}
