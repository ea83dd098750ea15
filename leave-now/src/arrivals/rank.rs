//! Arrival ranking for one platform.
//!
//! Turns a trip snapshot into the list of trains worth leaving for:
//! soonest first, with anything that would arrive before we could walk
//! to the platform dropped entirely.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{StopId, Trip};

/// A train arriving at the watched stop.
///
/// Field order matters: the derived ordering compares minutes first and
/// breaks ties on the route id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Arrival {
    /// Whole minutes until arrival, truncated toward zero.
    pub minutes: i64,

    /// Route the train runs on.
    pub route_id: String,
}

impl Arrival {
    pub fn new(minutes: i64, route_id: impl Into<String>) -> Self {
        Self {
            minutes,
            route_id: route_id.into(),
        }
    }
}

/// Arrivals sorted by (minutes, route id), all reachable on foot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedArrivals(Vec<Arrival>);

impl RankedArrivals {
    /// Returns the arrivals as a slice, best first.
    pub fn as_slice(&self) -> &[Arrival] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arrival> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a RankedArrivals {
    type Item = &'a Arrival;
    type IntoIter = std::slice::Iter<'a, Arrival>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Whole minutes from `now` until `instant`, truncated toward zero.
pub fn minutes_until(instant: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    instant.signed_duration_since(now).num_seconds() / 60
}

/// Rank the trains arriving at `stop`.
///
/// Each trip contributes at most one arrival: its first estimate for
/// `stop` in sequence. Arrivals under `walking_time_mins` are excluded.
/// A trip whose first matching estimate has no arrival instant is
/// skipped without affecting the others.
///
/// Pure: the same inputs always give the same output.
pub fn rank(
    trips: &[Trip],
    stop: &StopId,
    walking_time_mins: i64,
    now: DateTime<Utc>,
) -> RankedArrivals {
    let mut arrivals: Vec<Arrival> = trips
        .iter()
        .filter_map(|trip| {
            let estimate = trip.first_estimate_at(stop)?;
            let Some(instant) = estimate.arrival else {
                warn!(
                    trip_id = %trip.trip_id,
                    stop = %stop,
                    "skipping trip with no arrival time for stop"
                );
                return None;
            };
            Some(Arrival::new(
                minutes_until(instant, now),
                trip.route_id.clone(),
            ))
        })
        .filter(|a| a.minutes >= walking_time_mins)
        .collect();

    arrivals.sort();

    RankedArrivals(arrivals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StopEstimate;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 3, 7, 8, 0, 0).unwrap()
    }

    fn stop(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    /// Trip serving each (stop, seconds-from-now) in order.
    fn trip(id: &str, route: &str, stops: &[(&str, i64)]) -> Trip {
        Trip {
            trip_id: id.to_string(),
            route_id: route.to_string(),
            underway: true,
            stops: stops
                .iter()
                .map(|(s, secs)| StopEstimate::new(stop(s), now() + Duration::seconds(*secs)))
                .collect(),
        }
    }

    fn pairs(ranked: &RankedArrivals) -> Vec<(i64, &str)> {
        ranked
            .iter()
            .map(|a| (a.minutes, a.route_id.as_str()))
            .collect()
    }

    #[test]
    fn empty_trip_set_gives_empty_list() {
        let ranked = rank(&[], &stop("R31N"), 2, now());
        assert!(ranked.is_empty());
    }

    #[test]
    fn sorts_by_minutes_then_route() {
        let trips = vec![
            trip("1", "Q", &[("R31N", 9 * 60)]),
            trip("2", "F", &[("R31N", 7 * 60)]),
            trip("3", "N", &[("R31N", 3 * 60 + 30)]),
            trip("4", "D", &[("R31N", 3 * 60)]),
        ];

        let ranked = rank(&trips, &stop("R31N"), 2, now());

        assert_eq!(pairs(&ranked), [(3, "D"), (3, "N"), (7, "F"), (9, "Q")]);
    }

    #[test]
    fn minutes_truncate_toward_zero() {
        assert_eq!(minutes_until(now() + Duration::seconds(119), now()), 1);
        assert_eq!(minutes_until(now() + Duration::seconds(120), now()), 2);
        assert_eq!(minutes_until(now() + Duration::seconds(59), now()), 0);
        assert_eq!(minutes_until(now() - Duration::seconds(59), now()), 0);
        assert_eq!(minutes_until(now() - Duration::seconds(61), now()), -1);
    }

    #[test]
    fn excludes_trains_under_walking_time() {
        let trips = vec![
            trip("soon", "D", &[("R31N", 60)]),
            trip("edge", "N", &[("R31N", 2 * 60)]),
            trip("later", "R", &[("R31N", 5 * 60)]),
        ];

        let ranked = rank(&trips, &stop("R31N"), 2, now());

        assert_eq!(pairs(&ranked), [(2, "N"), (5, "R")]);
    }

    #[test]
    fn single_unreachable_train_gives_empty_list() {
        let trips = vec![trip("soon", "D", &[("R31N", 60)])];
        let ranked = rank(&trips, &stop("R31N"), 2, now());
        assert!(ranked.is_empty());
    }

    #[test]
    fn only_first_matching_stop_counts() {
        // Loops back through R31N; the later repeat is ignored even though
        // the first occurrence is too soon to catch.
        let trips = vec![trip("loop", "D", &[("R31N", 60), ("R32N", 300), ("R31N", 900)])];

        let ranked = rank(&trips, &stop("R31N"), 2, now());

        assert!(ranked.is_empty());
    }

    #[test]
    fn ignores_other_stops() {
        let trips = vec![
            trip("north", "D", &[("R31N", 600)]),
            trip("south", "D", &[("R31S", 300)]),
        ];

        let ranked = rank(&trips, &stop("R31S"), 2, now());

        assert_eq!(pairs(&ranked), [(5, "D")]);
    }

    #[test]
    fn malformed_trip_is_skipped() {
        let mut broken = trip("broken", "F", &[]);
        broken.stops.push(StopEstimate {
            stop_id: stop("R31N"),
            arrival: None,
        });

        let trips = vec![broken, trip("ok", "D", &[("R31N", 420)])];

        let ranked = rank(&trips, &stop("R31N"), 2, now());

        assert_eq!(pairs(&ranked), [(7, "D")]);
    }

    #[test]
    fn zero_walking_time_keeps_trains_at_the_platform() {
        let trips = vec![trip("here", "D", &[("R31N", 30)])];
        let ranked = rank(&trips, &stop("R31N"), 0, now());
        assert_eq!(pairs(&ranked), [(0, "D")]);
    }
}
