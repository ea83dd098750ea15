//! Conversion from GTFS-realtime messages to domain types.
//!
//! The feed interleaves trip updates and vehicle positions as separate
//! entities. A trip counts as underway when the same snapshot carries a
//! vehicle position for its trip id. Malformed entities are skipped with a
//! warning rather than failing the whole snapshot.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use gtfs_realtime::FeedMessage;
use gtfs_realtime::trip_update::{StopTimeEvent, StopTimeUpdate};
use prost::Message;
use tracing::warn;

use crate::domain::{StopEstimate, StopId, Trip, TripSet};

use super::error::FeedError;

/// Decode a protobuf-encoded feed snapshot.
pub fn decode_feed(bytes: &[u8]) -> Result<FeedMessage, FeedError> {
    FeedMessage::decode(bytes).map_err(|e| FeedError::Decode {
        message: e.to_string(),
    })
}

/// Convert a feed snapshot to the trips relevant to `targets`.
pub fn convert_feed(feed: &FeedMessage, targets: &[StopId]) -> TripSet {
    let live = feed.entity.iter().filter(|e| !e.is_deleted.unwrap_or(false));

    let moving: HashSet<&str> = live
        .clone()
        .filter_map(|e| e.vehicle.as_ref()?.trip.as_ref()?.trip_id.as_deref())
        .collect();

    let trips = live.filter_map(|entity| {
        let update = entity.trip_update.as_ref()?;

        let Some(trip_id) = update.trip.trip_id.as_deref() else {
            warn!(entity = %entity.id, "skipping trip update with no trip id");
            return None;
        };

        let Some(route_id) = update.trip.route_id.as_deref() else {
            warn!(trip_id, "skipping trip update with no route id");
            return None;
        };

        Some(Trip {
            trip_id: trip_id.to_string(),
            route_id: route_id.to_string(),
            underway: moving.contains(trip_id),
            stops: update
                .stop_time_update
                .iter()
                .filter_map(|stu| convert_stop_time(trip_id, stu))
                .collect(),
        })
    });

    TripSet::relevant_to(trips, targets, feed_timestamp(feed))
}

/// Timestamp the producer stamped on the snapshot, if any.
pub fn feed_timestamp(feed: &FeedMessage) -> Option<DateTime<Utc>> {
    feed.header
        .timestamp
        .and_then(|t| i64::try_from(t).ok())
        .and_then(|t| DateTime::from_timestamp(t, 0))
}

fn convert_stop_time(trip_id: &str, stu: &StopTimeUpdate) -> Option<StopEstimate> {
    let raw = stu.stop_id.as_deref().unwrap_or_default();
    let stop_id = match StopId::parse(raw) {
        Ok(stop_id) => stop_id,
        Err(e) => {
            warn!(trip_id, stop_id = raw, "skipping stop time update: {e}");
            return None;
        }
    };

    // Origin terminals only carry a departure time.
    let arrival = event_time(stu.arrival.as_ref()).or_else(|| event_time(stu.departure.as_ref()));

    Some(StopEstimate { stop_id, arrival })
}

fn event_time(event: Option<&StopTimeEvent>) -> Option<DateTime<Utc>> {
    event?.time.and_then(|t| DateTime::from_timestamp(t, 0))
}
