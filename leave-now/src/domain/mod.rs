//! Domain types for the arrival board.
//!
//! These are the validated, feed-independent shapes the rest of the crate
//! works with. Anything produced by the feed layer has already been
//! converted into these types, so ranking and display code never sees raw
//! protobuf messages.

mod direction;
mod stop;
mod trip;

pub use direction::Direction;
pub use stop::{InvalidStopId, StopId};
pub use trip::{StopEstimate, Trip, TripSet};
