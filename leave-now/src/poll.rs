//! Feed polling loop.
//!
//! Drives a [`TripSource`] on a fixed interval, ranks arrivals for both
//! directions and publishes the summaries into the shared display state.
//!
//! The loop is a small state machine:
//!
//! ```text
//! INIT --fetch_initial--> ACTIVE
//! ACTIVE: WAIT(interval) -> REFRESH -> COMPUTE(north) -> COMPUTE(south) -> PUBLISH -> WAIT
//! ```
//!
//! A failed fetch leaves both the last good snapshot and the published
//! state untouched, and pushes the next attempt out with exponential
//! backoff. Nothing short of process shutdown ends the loop.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::arrivals::{rank, summary};
use crate::domain::{Direction, StopId, TripSet};
use crate::feed::{FeedError, TripSource};
use crate::state::{DisplayState, SharedDisplayState};

/// Default wait between refreshes. The MTA regenerates feeds every 30
/// seconds and a snapshot is around 500 KiB, so there is no point going
/// much faster.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(65);

/// Default ceiling for the retry delay after repeated failures.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10 * 60);

/// Default time needed to walk to the platform.
pub const DEFAULT_WALKING_TIME_MINS: i64 = 2;

/// Configuration for the poll loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Northbound platform stop id.
    pub north_stop: StopId,

    /// Southbound platform stop id.
    pub south_stop: StopId,

    /// Trains arriving sooner than this (minutes) are not shown.
    pub walking_time_mins: i64,

    /// Wait between successful polls.
    pub interval: Duration,

    /// Longest wait between retries after failures.
    pub max_backoff: Duration,
}

impl PollConfig {
    /// Create a new config for the given platforms with default timings.
    pub fn new(north_stop: StopId, south_stop: StopId) -> Self {
        Self {
            north_stop,
            south_stop,
            walking_time_mins: DEFAULT_WALKING_TIME_MINS,
            interval: DEFAULT_POLL_INTERVAL,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }

    pub fn with_walking_time(mut self, mins: i64) -> Self {
        self.walking_time_mins = mins;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// The stop id watched for `direction`.
    pub fn stop_for(&self, direction: Direction) -> &StopId {
        match direction {
            Direction::North => &self.north_stop,
            Direction::South => &self.south_stop,
        }
    }

    /// Delay before the next attempt after `failures` consecutive failures.
    ///
    /// Zero failures waits the normal interval. The first failure retries
    /// at the next scheduled interval, then the delay doubles each time up
    /// to `max_backoff` (never below `interval`).
    pub fn delay_after(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.interval;
        }

        let exponent = (failures - 1).min(16);
        let ceiling = self.max_backoff.max(self.interval);
        self.interval.saturating_mul(1 << exponent).min(ceiling)
    }
}

/// The poll loop and its state.
pub struct PollLoop<S> {
    source: S,
    state: SharedDisplayState,
    config: PollConfig,
    trips: Option<TripSet>,
    failures: u32,
}

impl<S: TripSource> PollLoop<S> {
    /// Create a poll loop publishing into `state`.
    pub fn new(source: S, state: SharedDisplayState, config: PollConfig) -> Self {
        Self {
            source,
            state,
            config,
            trips: None,
            failures: 0,
        }
    }

    /// The last successfully fetched snapshot, if any.
    pub fn trips(&self) -> Option<&TripSet> {
        self.trips.as_ref()
    }

    /// Number of fetch failures since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Delay before the next cycle should run.
    pub fn next_delay(&self) -> Duration {
        self.config.delay_after(self.failures)
    }

    /// Run one poll cycle.
    ///
    /// Fetches the initial snapshot if none has been fetched yet, otherwise
    /// refreshes. On success the new summaries are published; on failure
    /// nothing observable changes except the failure count.
    ///
    /// `clock` is read once the fetch has resolved, so arrivals are ranked
    /// against the time the data arrived rather than when it was requested.
    pub async fn cycle<C>(&mut self, clock: C) -> Result<(), FeedError>
    where
        C: FnOnce() -> DateTime<Utc>,
    {
        let fetched = match &self.trips {
            None => self.source.fetch_initial().await,
            Some(existing) => self.source.refresh(existing).await,
        };

        match fetched {
            Ok(trips) => {
                self.accept(trips, clock()).await;
                Ok(())
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                Err(e)
            }
        }
    }

    /// Summaries for both directions from `trips`.
    pub fn compute(&self, trips: &TripSet, now: DateTime<Utc>) -> DisplayState {
        let [north, south] = Direction::ALL.map(|direction| {
            let ranked = rank(
                &trips.trips,
                self.config.stop_for(direction),
                self.config.walking_time_mins,
                now,
            );
            summary(direction, &ranked)
        });

        DisplayState::new(north, south)
    }

    async fn accept(&mut self, trips: TripSet, now: DateTime<Utc>) {
        let state = self.compute(&trips, now);
        self.state.publish(state).await;
        self.trips = Some(trips);
        self.failures = 0;
    }

    /// Poll forever.
    pub async fn run(mut self) {
        info!(
            north = %self.config.north_stop,
            south = %self.config.south_stop,
            interval_secs = self.config.interval.as_secs(),
            "poll loop starting"
        );

        loop {
            match self.cycle(Utc::now).await {
                Ok(()) => {
                    let trips = self.trips.as_ref().map_or(0, TripSet::len);
                    info!(trips, "published arrivals");
                }
                Err(e) if e.is_retriable() => {
                    warn!(
                        failures = self.failures,
                        retry_in_secs = self.next_delay().as_secs(),
                        "feed fetch failed, keeping last known arrivals: {e}"
                    );
                }
                Err(e) => {
                    error!(
                        failures = self.failures,
                        retry_in_secs = self.next_delay().as_secs(),
                        "feed fetch failed: {e}"
                    );
                }
            }

            tokio::time::sleep(self.next_delay()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StopEstimate, Trip};
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 3, 7, 8, 0, 0).unwrap()
    }

    fn stop(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn config() -> PollConfig {
        PollConfig::new(stop("R31N"), stop("R31S"))
    }

    /// Trip arriving at `stop_id` after `secs` seconds.
    fn trip(id: &str, route: &str, stop_id: &str, secs: i64) -> Trip {
        Trip {
            trip_id: id.to_string(),
            route_id: route.to_string(),
            underway: true,
            stops: vec![StopEstimate::new(
                stop(stop_id),
                now() + chrono::Duration::seconds(secs),
            )],
        }
    }

    fn set(trips: Vec<Trip>) -> TripSet {
        TripSet::new(trips, Some(now()))
    }

    /// Mock trip source replaying scripted responses.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<TripSet, FeedError>>>,
        initial_calls: Mutex<usize>,
        refreshed_from: Mutex<Vec<TripSet>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<TripSet, FeedError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                initial_calls: Mutex::new(0),
                refreshed_from: Mutex::new(Vec::new()),
            }
        }

        fn next(&self) -> Result<TripSet, FeedError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")
        }
    }

    impl TripSource for &ScriptedSource {
        async fn fetch_initial(&self) -> Result<TripSet, FeedError> {
            *self.initial_calls.lock().unwrap() += 1;
            self.next()
        }

        async fn refresh(&self, existing: &TripSet) -> Result<TripSet, FeedError> {
            self.refreshed_from.lock().unwrap().push(existing.clone());
            self.next()
        }
    }

    fn network_error() -> FeedError {
        FeedError::Api {
            status: 503,
            message: "Service Unavailable".into(),
        }
    }

    #[tokio::test]
    async fn initial_cycle_publishes_both_directions() {
        let source = ScriptedSource::new(vec![Ok(set(vec![
            trip("d", "D", "R31N", 5 * 60 + 10),
            trip("n", "N", "R31S", 3 * 60 + 10),
            trip("r", "R", "R31S", 8 * 60 + 10),
        ]))]);
        let shared = SharedDisplayState::default();
        let mut poller = PollLoop::new(&source, shared.clone(), config());

        poller.cycle(now).await.unwrap();

        let state = shared.snapshot().await;
        assert_eq!(state.north, "Nor (D) in 5'");
        assert_eq!(state.south, "Sou (N):3', (R):8'");
        assert_eq!(*source.initial_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn unreachable_train_shows_no_data() {
        let source = ScriptedSource::new(vec![Ok(set(vec![trip("d", "D", "R31N", 60)]))]);
        let shared = SharedDisplayState::default();
        let mut poller = PollLoop::new(&source, shared.clone(), config().with_walking_time(2));

        poller.cycle(now).await.unwrap();

        let state = shared.snapshot().await;
        assert_eq!(state.north, "No North train data.");
        assert_eq!(state.south, "No South train data.");
    }

    #[tokio::test]
    async fn second_cycle_replaces_first_entirely() {
        let first = set(vec![
            trip("d1", "D", "R31N", 4 * 60 + 10),
            trip("n1", "N", "R31S", 6 * 60 + 10),
        ]);
        let second = set(vec![trip("q2", "Q", "R31N", 9 * 60 + 10)]);

        let source = ScriptedSource::new(vec![Ok(first.clone()), Ok(second.clone())]);
        let shared = SharedDisplayState::default();
        let mut poller = PollLoop::new(&source, shared.clone(), config());

        poller.cycle(now).await.unwrap();
        poller.cycle(now).await.unwrap();

        let state = shared.snapshot().await;
        assert_eq!(state.north, "Nor (Q) in 9'");
        assert_eq!(state.south, "No South train data.");
        assert_eq!(poller.trips(), Some(&second));

        // The refresh was handed the first snapshot, unmodified.
        assert_eq!(*source.refreshed_from.lock().unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_good_state() {
        let first = set(vec![trip("d1", "D", "R31N", 4 * 60 + 10)]);
        let third = set(vec![trip("f3", "F", "R31N", 7 * 60 + 10)]);

        let source = ScriptedSource::new(vec![
            Ok(first.clone()),
            Err(network_error()),
            Ok(third),
        ]);
        let shared = SharedDisplayState::default();
        let mut poller = PollLoop::new(&source, shared.clone(), config());

        poller.cycle(now).await.unwrap();
        let after_first = shared.snapshot().await;

        let err = poller.cycle(now).await.unwrap_err();
        assert!(err.is_retriable());
        assert_eq!(*shared.snapshot().await, *after_first);
        assert_eq!(poller.trips(), Some(&first));
        assert_eq!(poller.consecutive_failures(), 1);

        // Cycle 3 still runs and refreshes from the retained snapshot.
        poller.cycle(now).await.unwrap();
        assert_eq!(shared.snapshot().await.north, "Nor (F) in 7'");
        assert_eq!(poller.consecutive_failures(), 0);
        assert_eq!(source.refreshed_from.lock().unwrap().len(), 2);
        assert_eq!(source.refreshed_from.lock().unwrap()[1], first);
    }

    #[tokio::test]
    async fn failed_initial_fetch_keeps_loading_and_retries_initial() {
        let source = ScriptedSource::new(vec![
            Err(network_error()),
            Ok(set(vec![trip("d", "D", "R31N", 3 * 60 + 10)])),
        ]);
        let shared = SharedDisplayState::default();
        let mut poller = PollLoop::new(&source, shared.clone(), config());

        assert!(poller.cycle(now).await.is_err());
        assert_eq!(*shared.snapshot().await, DisplayState::loading());
        assert!(poller.trips().is_none());

        poller.cycle(now).await.unwrap();
        assert_eq!(shared.snapshot().await.north, "Nor (D) in 3'");
        assert_eq!(*source.initial_calls.lock().unwrap(), 2);
        assert!(source.refreshed_from.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn next_delay_backs_off_and_resets() {
        let source = ScriptedSource::new(vec![
            Ok(set(vec![])),
            Err(network_error()),
            Err(FeedError::RateLimited),
            Ok(set(vec![])),
        ]);
        let cfg = config()
            .with_interval(Duration::from_secs(60))
            .with_max_backoff(Duration::from_secs(600));
        let mut poller = PollLoop::new(&source, SharedDisplayState::default(), cfg);

        poller.cycle(now).await.unwrap();
        assert_eq!(poller.next_delay(), Duration::from_secs(60));

        let _ = poller.cycle(now).await;
        assert_eq!(poller.next_delay(), Duration::from_secs(60));

        let _ = poller.cycle(now).await;
        assert_eq!(poller.next_delay(), Duration::from_secs(120));

        poller.cycle(now).await.unwrap();
        assert_eq!(poller.next_delay(), Duration::from_secs(60));
    }

    /// Source that takes `delay` to answer, like a slow feed endpoint.
    struct SlowSource {
        delay: Duration,
        trips: TripSet,
    }

    impl TripSource for SlowSource {
        async fn fetch_initial(&self) -> Result<TripSet, FeedError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.trips.clone())
        }

        async fn refresh(&self, _existing: &TripSet) -> Result<TripSet, FeedError> {
            self.fetch_initial().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ranks_against_time_the_fetch_resolved() {
        // The response lands 3s after the request, with the D 119s after that.
        let source = SlowSource {
            delay: Duration::from_secs(3),
            trips: set(vec![trip("d", "D", "R31N", 3 + 119)]),
        };
        let shared = SharedDisplayState::default();
        let mut poller = PollLoop::new(source, shared.clone(), config().with_walking_time(2));

        let start = tokio::time::Instant::now();
        let clock = move || now() + chrono::Duration::from_std(start.elapsed()).unwrap();
        poller.cycle(clock).await.unwrap();

        // 119s is one whole minute: too soon to walk there.
        assert_eq!(shared.snapshot().await.north, "No North train data.");
    }

    /// Trip arriving `secs` from the real clock, for tests that drive `run`.
    fn live_trip(id: &str, route: &str, stop_id: &str, secs: i64) -> Trip {
        Trip {
            trip_id: id.to_string(),
            route_id: route.to_string(),
            underway: true,
            stops: vec![StopEstimate::new(
                stop(stop_id),
                Utc::now() + chrono::Duration::seconds(secs),
            )],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_survives_failed_refresh() {
        let source: &'static ScriptedSource = Box::leak(Box::new(ScriptedSource::new(vec![
            Ok(TripSet::new(vec![live_trip("d1", "D", "R31N", 5 * 60 + 30)], None)),
            Err(network_error()),
            Ok(TripSet::new(vec![live_trip("f3", "F", "R31N", 7 * 60 + 30)], None)),
        ])));
        let interval = Duration::from_secs(10);
        let shared = SharedDisplayState::default();
        let poller = PollLoop::new(source, shared.clone(), config().with_interval(interval));

        let handle = tokio::spawn(poller.run());
        let step = Duration::from_millis(1);

        // Cycle 1 runs straight away.
        tokio::time::sleep(step).await;
        assert_eq!(shared.snapshot().await.north, "Nor (D) in 5'");
        let after_first = shared.snapshot().await;

        // Cycle 2 fails: nothing published, loop still alive.
        tokio::time::sleep(interval).await;
        assert_eq!(source.refreshed_from.lock().unwrap().len(), 1);
        assert_eq!(*shared.snapshot().await, *after_first);
        assert!(!handle.is_finished());

        // First failure retries after one interval; cycle 3 publishes.
        tokio::time::sleep(interval).await;
        assert_eq!(source.refreshed_from.lock().unwrap().len(), 2);
        assert_eq!(shared.snapshot().await.north, "Nor (F) in 7'");
        assert!(!handle.is_finished());

        handle.abort();
    }

    #[tokio::test]
    async fn replays_shipped_fixtures() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");
        let source = crate::feed::FixtureFeed::new(dir, vec![stop("R31N"), stop("R31S")]).unwrap();
        let shared = SharedDisplayState::default();
        let mut poller = PollLoop::new(source, shared.clone(), config());

        poller.cycle(Utc::now).await.unwrap();
        let state = shared.snapshot().await;
        assert_eq!(state.north, "Nor (D):3', (N):7'");
        assert_eq!(state.south, "Sou (N) in 9'");

        // Second snapshot: the southbound B has no arrival time and is skipped.
        poller.cycle(Utc::now).await.unwrap();
        let state = shared.snapshot().await;
        assert_eq!(state.north, "Nor (Q) in 5'");
        assert_eq!(state.south, "No South train data.");
    }

    #[test]
    fn delay_schedule() {
        let cfg = config()
            .with_interval(Duration::from_secs(65))
            .with_max_backoff(Duration::from_secs(600));

        assert_eq!(cfg.delay_after(0), Duration::from_secs(65));
        assert_eq!(cfg.delay_after(1), Duration::from_secs(65));
        assert_eq!(cfg.delay_after(2), Duration::from_secs(130));
        assert_eq!(cfg.delay_after(3), Duration::from_secs(260));
        assert_eq!(cfg.delay_after(4), Duration::from_secs(520));
        assert_eq!(cfg.delay_after(5), Duration::from_secs(600));
        assert_eq!(cfg.delay_after(u32::MAX), Duration::from_secs(600));
    }

    #[test]
    fn delay_never_below_interval() {
        let cfg = config()
            .with_interval(Duration::from_secs(120))
            .with_max_backoff(Duration::from_secs(30));

        assert_eq!(cfg.delay_after(3), Duration::from_secs(120));
    }

    #[test]
    fn config_defaults() {
        let cfg = config();
        assert_eq!(cfg.walking_time_mins, 2);
        assert_eq!(cfg.interval, Duration::from_secs(65));
        assert_eq!(cfg.max_backoff, Duration::from_secs(600));
        assert_eq!(cfg.stop_for(Direction::North), &stop("R31N"));
        assert_eq!(cfg.stop_for(Direction::South), &stop("R31S"));
    }
}
