//! Transit feed access.
//!
//! This module provides the sources the poll loop pulls trip snapshots
//! from: a GTFS-realtime HTTP client for the live feed and a fixture
//! replayer for development.
//!
//! Key characteristics of the feed:
//! - Every refresh returns a complete, independent snapshot; nothing is
//!   patched in place, so the previous snapshot is simply dropped
//! - Arrival estimates are absolute POSIX timestamps
//! - The provider regenerates the feed roughly every 30 seconds, so
//!   polling faster than that only wastes bandwidth

mod client;
mod convert;
mod error;
mod fixture;

use std::future::Future;

use crate::domain::TripSet;

pub use client::{DEFAULT_FEED_URL, FeedClient, FeedConfig};
pub use convert::{convert_feed, decode_feed, feed_timestamp};
pub use error::FeedError;
pub use fixture::FixtureFeed;

/// A source of trip snapshots.
///
/// Implementations return trips already filtered to the ones that are
/// underway and headed for the stops being watched.
pub trait TripSource {
    /// Fetch the first snapshot.
    fn fetch_initial(&self) -> impl Future<Output = Result<TripSet, FeedError>> + Send;

    /// Fetch a fresh snapshot to replace `existing`.
    ///
    /// `existing` is never modified; the caller drops it once the new
    /// snapshot arrives.
    fn refresh(
        &self,
        existing: &TripSet,
    ) -> impl Future<Output = Result<TripSet, FeedError>> + Send;
}
