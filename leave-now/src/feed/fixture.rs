//! Fixture feed for running without API access.
//!
//! Loads snapshots from JSON files and serves them as if they were live
//! feed responses. Files are served in name order, one per fetch, wrapping
//! around at the end, so a directory of snapshots plays back like a feed
//! that changes between refreshes.
//!
//! Stop times are given relative to the moment of the fetch, so fixtures
//! never go stale:
//!
//! ```json
//! {
//!   "trips": [
//!     {
//!       "trip_id": "097550_D..N",
//!       "route_id": "D",
//!       "underway": true,
//!       "stops": [{ "stop_id": "R31N", "in_secs": 240 }]
//!     }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::domain::{StopEstimate, StopId, Trip, TripSet};

use super::TripSource;
use super::error::FeedError;

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    trips: Vec<TripFixture>,
}

#[derive(Debug, Deserialize)]
struct TripFixture {
    trip_id: String,
    route_id: String,
    #[serde(default = "default_underway")]
    underway: bool,
    stops: Vec<StopFixture>,
}

#[derive(Debug, Deserialize)]
struct StopFixture {
    stop_id: StopId,
    /// Seconds from fetch time; absent means the feed gave no time.
    in_secs: Option<i64>,
}

fn default_underway() -> bool {
    true
}

impl TripFixture {
    fn into_trip(self, now: DateTime<Utc>) -> Trip {
        Trip {
            trip_id: self.trip_id,
            route_id: self.route_id,
            underway: self.underway,
            stops: self
                .stops
                .into_iter()
                .map(|s| StopEstimate {
                    stop_id: s.stop_id,
                    arrival: s.in_secs.map(|secs| now + Duration::seconds(secs)),
                })
                .collect(),
        }
    }
}

/// Trip source that replays JSON snapshots from a directory.
#[derive(Debug)]
pub struct FixtureFeed {
    files: Vec<PathBuf>,
    target_stops: Vec<StopId>,
    next: AtomicUsize,
}

impl FixtureFeed {
    /// Create a fixture feed from every `.json` file in `dir`.
    pub fn new(dir: impl AsRef<Path>, target_stops: Vec<StopId>) -> Result<Self, FeedError> {
        let dir = dir.as_ref();

        let entries = std::fs::read_dir(dir).map_err(|e| FeedError::Fixture {
            message: format!("Failed to read fixture directory {}: {e}", dir.display()),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FeedError::Fixture {
                message: format!("Failed to read directory entry: {e}"),
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(FeedError::Fixture {
                message: format!("No fixture snapshots found in {}", dir.display()),
            });
        }

        files.sort();

        Ok(Self {
            files,
            target_stops,
            next: AtomicUsize::new(0),
        })
    }

    /// Number of snapshots in rotation.
    pub fn snapshot_count(&self) -> usize {
        self.files.len()
    }

    fn load_next(&self, now: DateTime<Utc>) -> Result<TripSet, FeedError> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.files.len();
        let path = &self.files[idx];

        let json = std::fs::read_to_string(path).map_err(|e| FeedError::Fixture {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;

        let snapshot: SnapshotFile = serde_json::from_str(&json).map_err(|e| FeedError::Fixture {
            message: format!("Failed to parse {}: {e}", path.display()),
        })?;

        let trips = snapshot.trips.into_iter().map(|t| t.into_trip(now));

        Ok(TripSet::relevant_to(trips, &self.target_stops, Some(now)))
    }
}

impl TripSource for FixtureFeed {
    async fn fetch_initial(&self) -> Result<TripSet, FeedError> {
        self.load_next(Utc::now())
    }

    async fn refresh(&self, _existing: &TripSet) -> Result<TripSet, FeedError> {
        self.load_next(Utc::now())
    }
}
