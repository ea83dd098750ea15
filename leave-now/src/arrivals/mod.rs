//! Arrival computation: ranking trains at a stop and summarising them.

mod rank;
mod summary;

pub use rank::{Arrival, RankedArrivals, minutes_until, rank};
pub use summary::summary;
