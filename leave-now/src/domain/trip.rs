//! Trips and their per-stop estimates.
//!
//! A [`TripSet`] is an immutable snapshot of the feed. Every refresh
//! produces a new one; trips are never patched in place, so a snapshot
//! held by one cycle can never be altered by the next.

use chrono::{DateTime, Utc};

use super::StopId;

/// Predicted arrival of a trip at one stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopEstimate {
    /// The stop (platform) being served.
    pub stop_id: StopId,

    /// Estimated arrival instant. `None` when the feed gave neither an
    /// arrival nor a departure time for this stop.
    pub arrival: Option<DateTime<Utc>>,
}

impl StopEstimate {
    /// Create an estimate with a known arrival instant.
    pub fn new(stop_id: StopId, arrival: DateTime<Utc>) -> Self {
        Self {
            stop_id,
            arrival: Some(arrival),
        }
    }
}

/// One in-service train run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    /// Feed trip identifier (e.g. "097550_D..N").
    pub trip_id: String,

    /// Route the trip runs on (e.g. "D").
    pub route_id: String,

    /// Whether the train has a live vehicle position, i.e. is moving.
    pub underway: bool,

    /// Remaining stops, in the order the train serves them.
    pub stops: Vec<StopEstimate>,
}

impl Trip {
    /// Returns the first estimate for `stop` in sequence.
    ///
    /// If a route loops back through the same stop, only the first
    /// occurrence is returned: it is the next time this train serves it.
    pub fn first_estimate_at(&self, stop: &StopId) -> Option<&StopEstimate> {
        self.stops.iter().find(|s| &s.stop_id == stop)
    }

    /// Whether any of the remaining stops is one of `targets`.
    pub fn is_headed_for(&self, targets: &[StopId]) -> bool {
        self.stops.iter().any(|s| targets.contains(&s.stop_id))
    }
}

/// A snapshot of the trips tracked by the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripSet {
    /// Trips in this snapshot.
    pub trips: Vec<Trip>,

    /// When the feed producer generated the snapshot, if it said.
    pub feed_timestamp: Option<DateTime<Utc>>,
}

impl TripSet {
    /// Create a snapshot from trips that are already filtered.
    pub fn new(trips: Vec<Trip>, feed_timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            trips,
            feed_timestamp,
        }
    }

    /// Build a snapshot holding only trips that are underway and headed
    /// for one of `targets`.
    pub fn relevant_to(
        trips: impl IntoIterator<Item = Trip>,
        targets: &[StopId],
        feed_timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        let trips = trips
            .into_iter()
            .filter(|t| t.underway && t.is_headed_for(targets))
            .collect();

        Self::new(trips, feed_timestamp)
    }

    /// Number of trips in the snapshot.
    pub fn len(&self) -> usize {
        self.trips.len()
    }

    /// Whether the snapshot has no trips.
    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}
