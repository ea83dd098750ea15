//! Stop identifier types.

use std::fmt;

use serde::Deserialize;

/// Error returned when parsing an invalid stop identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stop id: {reason}")]
pub struct InvalidStopId {
    reason: &'static str,
}

/// A GTFS stop identifier, including any platform/direction suffix.
///
/// The MTA encodes direction in the last character, so `R31N` is the
/// northbound platform at Atlantic Av - Barclays Ctr and `R31S` the
/// southbound one. Any `StopId` value is non-empty and free of whitespace.
///
/// # Examples
///
/// ```
/// use leave_now::domain::StopId;
///
/// let stop = StopId::parse("R31N").unwrap();
/// assert_eq!(stop.as_str(), "R31N");
///
/// assert!(StopId::parse("").is_err());
/// assert!(StopId::parse("R31 N").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct StopId(String);

impl StopId {
    /// Parse a stop identifier.
    pub fn parse(s: &str) -> Result<Self, InvalidStopId> {
        if s.is_empty() {
            return Err(InvalidStopId {
                reason: "must not be empty",
            });
        }

        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(InvalidStopId {
                reason: "must not contain whitespace or control characters",
            });
        }

        Ok(StopId(s.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StopId {
    type Error = InvalidStopId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StopId::parse(&value)
    }
}

impl PartialEq<str> for StopId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopId({})", self.0)
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
