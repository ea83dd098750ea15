//! Leave Now: a subway arrival board for one station.
//!
//! Polls a GTFS-realtime feed, ranks the next trains in each direction
//! that can still be caught on foot, and keeps a four line character
//! display up to date. Polling and rendering run as two independent loops
//! that share only the latest [`state::DisplayState`].

pub mod arrivals;
pub mod config;
pub mod display;
pub mod domain;
pub mod feed;
pub mod poll;
pub mod render;
pub mod state;
