//! Startup configuration from environment variables.
//!
//! | Variable                     | Default                    |
//! |------------------------------|----------------------------|
//! | `LEAVE_NOW_API_KEY`          | required unless replaying  |
//! | `LEAVE_NOW_FEED_URL`         | NYCT BDFM feed             |
//! | `LEAVE_NOW_NORTH_STOP`       | `R31N`                     |
//! | `LEAVE_NOW_SOUTH_STOP`       | `R31S`                     |
//! | `LEAVE_NOW_WALKING_MINS`     | `2`                        |
//! | `LEAVE_NOW_POLL_SECS`        | `65`                       |
//! | `LEAVE_NOW_MAX_BACKOFF_SECS` | `600`                      |
//! | `LEAVE_NOW_DISPLAY_COLUMNS`  | `20`                       |
//! | `LEAVE_NOW_FIXTURE_DIR`      | unset (use the live feed)  |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::display::DEFAULT_COLUMNS;
use crate::domain::{InvalidStopId, StopId};
use crate::feed::{DEFAULT_FEED_URL, FeedConfig};
use crate::poll::{DEFAULT_MAX_BACKOFF, DEFAULT_POLL_INTERVAL, DEFAULT_WALKING_TIME_MINS, PollConfig};

const API_KEY: &str = "LEAVE_NOW_API_KEY";
const FEED_URL: &str = "LEAVE_NOW_FEED_URL";
const NORTH_STOP: &str = "LEAVE_NOW_NORTH_STOP";
const SOUTH_STOP: &str = "LEAVE_NOW_SOUTH_STOP";
const WALKING_MINS: &str = "LEAVE_NOW_WALKING_MINS";
const POLL_SECS: &str = "LEAVE_NOW_POLL_SECS";
const MAX_BACKOFF_SECS: &str = "LEAVE_NOW_MAX_BACKOFF_SECS";
const DISPLAY_COLUMNS: &str = "LEAVE_NOW_DISPLAY_COLUMNS";
const FIXTURE_DIR: &str = "LEAVE_NOW_FIXTURE_DIR";

/// Errors found while reading configuration. All are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable could not be parsed
    #[error("{var}: cannot parse {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// A stop id variable held an invalid stop id
    #[error("{var}: {source}")]
    Stop {
        var: &'static str,
        source: InvalidStopId,
    },

    /// North and south stops are the same
    #[error("north and south stops must differ (both {0})")]
    SameStops(StopId),
}

/// Validated daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Feed API key. `None` only when replaying fixtures.
    pub api_key: Option<String>,
    pub feed_url: String,
    pub north_stop: StopId,
    pub south_stop: StopId,
    pub walking_time_mins: i64,
    pub poll_interval: Duration,
    pub max_backoff: Duration,
    pub display_columns: usize,
    /// Directory of JSON snapshots to replay instead of the live feed.
    pub fixture_dir: Option<PathBuf>,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, treating empty values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let fixture_dir = get(FIXTURE_DIR).map(PathBuf::from);
        let api_key = get(API_KEY);
        if api_key.is_none() && fixture_dir.is_none() {
            return Err(ConfigError::Missing(API_KEY));
        }

        let north_stop = parse_stop(NORTH_STOP, get(NORTH_STOP), "R31N")?;
        let south_stop = parse_stop(SOUTH_STOP, get(SOUTH_STOP), "R31S")?;
        if north_stop == south_stop {
            return Err(ConfigError::SameStops(north_stop));
        }

        let walking_time_mins: i64 =
            parse_or(WALKING_MINS, get(WALKING_MINS), DEFAULT_WALKING_TIME_MINS)?;
        if walking_time_mins < 0 {
            return Err(invalid(WALKING_MINS, walking_time_mins, "must not be negative"));
        }

        let poll_secs: u64 = parse_or(POLL_SECS, get(POLL_SECS), DEFAULT_POLL_INTERVAL.as_secs())?;
        if poll_secs == 0 {
            return Err(invalid(POLL_SECS, poll_secs, "must be at least 1"));
        }

        let max_backoff_secs: u64 =
            parse_or(MAX_BACKOFF_SECS, get(MAX_BACKOFF_SECS), DEFAULT_MAX_BACKOFF.as_secs())?;

        let display_columns: usize = parse_or(DISPLAY_COLUMNS, get(DISPLAY_COLUMNS), DEFAULT_COLUMNS)?;
        if display_columns == 0 {
            return Err(invalid(DISPLAY_COLUMNS, display_columns, "must be at least 1"));
        }

        Ok(Self {
            api_key,
            feed_url: get(FEED_URL).unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            north_stop,
            south_stop,
            walking_time_mins,
            poll_interval: Duration::from_secs(poll_secs),
            max_backoff: Duration::from_secs(max_backoff_secs),
            display_columns,
            fixture_dir,
        })
    }

    /// Both watched stops.
    pub fn target_stops(&self) -> Vec<StopId> {
        vec![self.north_stop.clone(), self.south_stop.clone()]
    }

    /// Feed client configuration, if a live feed is configured.
    pub fn feed_config(&self) -> Option<FeedConfig> {
        let api_key = self.api_key.as_ref()?;
        Some(FeedConfig::new(api_key.clone(), self.target_stops()).with_url(self.feed_url.clone()))
    }

    /// Poll loop configuration.
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(self.north_stop.clone(), self.south_stop.clone())
            .with_walking_time(self.walking_time_mins)
            .with_interval(self.poll_interval)
            .with_max_backoff(self.max_backoff)
    }
}

fn invalid(var: &'static str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_stop(var: &'static str, value: Option<String>, default: &str) -> Result<StopId, ConfigError> {
    let value = value.unwrap_or_else(|| default.to_string());
    StopId::parse(value.trim()).map_err(|source| ConfigError::Stop { var, source })
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
