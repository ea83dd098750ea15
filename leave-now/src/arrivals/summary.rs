//! One-line arrival summaries for the display.

use crate::domain::Direction;

use super::RankedArrivals;

/// Summarise the ranked arrivals for one direction.
///
/// - no arrivals: `No North train data.`
/// - one arrival: `Nor (D) in 5'`
/// - two or more: `Nor (D):3', (F):7'` (only the first two are shown)
pub fn summary(direction: Direction, arrivals: &RankedArrivals) -> String {
    match arrivals.as_slice() {
        [] => format!("No {} train data.", direction.name()),
        [only] => format!("{} ({}) in {}'", direction.label(), only.route_id, only.minutes),
        [first, second, ..] => format!(
            "{} ({}):{}', ({}):{}'",
            direction.label(),
            first.route_id,
            first.minutes,
            second.route_id,
            second.minutes
        ),
    }
}
