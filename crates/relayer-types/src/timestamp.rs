use core::fmt::{Display, Error as FmtError, Formatter};
use core::num::ParseIntError;
use core::ops::Add;
use core::str::FromStr;
use core::time::Duration;

use chrono::{DateTime, Utc};
use flex_error::{define_error, TraceError};
use serde_derive::{Deserialize, Serialize};

pub const ZERO_DURATION: Duration = Duration::from_secs(0);

/// A newtype wrapper over a Unix timestamp in nanoseconds, used to keep track
/// of block times and IBC packet timeouts.
///
/// In protocol messages the timestamp is represented as a `u64` Unix
/// timestamp in nanoseconds, with 0 representing the absence of timestamp.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default, Deserialize, Serialize, Hash)]
pub struct Timestamp {
    nanoseconds: u64,
}

/// The expiry result when comparing two timestamps.
/// - If either timestamp is not set (0), the result is `InvalidTimestamp`.
/// - If the left timestamp is at or after the right timestamp, the result is `Expired`.
/// - Otherwise, the result is `NotExpired`.
///
/// User of this result may want to determine whether error should be raised,
/// when either of the timestamp being compared is invalid.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Deserialize, Serialize, Hash)]
pub enum Expiry {
    Expired,
    NotExpired,
    InvalidTimestamp,
}

impl Timestamp {
    /// The IBC protocol represents timestamps as u64 Unix
    /// timestamps in nanoseconds.
    ///
    /// A protocol value of 0 indicates that the timestamp
    /// is not set.
    pub const fn from_nanoseconds(nanoseconds: u64) -> Timestamp {
        Timestamp { nanoseconds }
    }

    /// Returns a `Timestamp` representation of the current time.
    pub fn now() -> Timestamp {
        let nanoseconds = Utc::now()
            .timestamp_nanos_opt()
            .and_then(|nanos| u64::try_from(nanos).ok())
            .unwrap_or_default();

        Timestamp { nanoseconds }
    }

    /// Returns a `Timestamp` representation of a timestamp not being set.
    pub const fn none() -> Self {
        Timestamp { nanoseconds: 0 }
    }

    pub fn is_set(&self) -> bool {
        self.nanoseconds != 0
    }

    /// Computes the duration difference of another `Timestamp` from the current one.
    /// Returns the difference in time as an [`core::time::Duration`].
    /// Returns `None` if the other `Timestamp` is more advanced
    /// than the current or if either of the `Timestamp`s is not set.
    pub fn duration_since(&self, other: &Timestamp) -> Option<Duration> {
        if !self.is_set() || !other.is_set() {
            return None;
        }

        self.nanoseconds
            .checked_sub(other.nanoseconds)
            .map(Duration::from_nanos)
    }

    /// Convert a `Timestamp` to `u64` value in nanoseconds. If no timestamp
    /// is set, the result is 0.
    pub fn nanoseconds(&self) -> u64 {
        self.nanoseconds
    }

    /// Convert a `Timestamp` to an optional [`chrono::DateTime<Utc>`]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        if !self.is_set() {
            return None;
        }

        let secs = i64::try_from(self.nanoseconds / 1_000_000_000).ok()?;
        let nanos = u32::try_from(self.nanoseconds % 1_000_000_000).ok()?;

        DateTime::from_timestamp(secs, nanos)
    }

    /// Checks whether the timestamp has reached the `deadline` timestamp.
    /// Returns an [`Expiry`] result.
    pub fn check_expiry(&self, deadline: &Timestamp) -> Expiry {
        if !self.is_set() || !deadline.is_set() {
            return Expiry::InvalidTimestamp;
        }

        if self.nanoseconds >= deadline.nanoseconds {
            Expiry::Expired
        } else {
            Expiry::NotExpired
        }
    }

    /// Checks whether the current timestamp is strictly more advanced
    /// than the `other` timestamp. Return true if so, and false
    /// otherwise.
    pub fn after(&self, other: &Timestamp) -> bool {
        self.is_set() && other.is_set() && self.nanoseconds > other.nanoseconds
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self.as_datetime() {
            Some(datetime) => write!(f, "Timestamp({})", datetime.to_rfc3339()),
            None => write!(f, "NoTimestamp"),
        }
    }
}

define_error! {
    TimestampOverflowError {
        TimestampOverflow
            |_| { "Timestamp overflow when modifying with duration" }
    }
}

impl Add<Duration> for Timestamp {
    type Output = Result<Timestamp, TimestampOverflowError>;

    fn add(self, duration: Duration) -> Result<Timestamp, TimestampOverflowError> {
        let delta = u64::try_from(duration.as_nanos())
            .map_err(|_| TimestampOverflowError::timestamp_overflow())?;

        self.nanoseconds
            .checked_add(delta)
            .map(Timestamp::from_nanoseconds)
            .ok_or_else(TimestampOverflowError::timestamp_overflow)
    }
}

define_error! {
    ParseTimestampError {
        ParseInt
            [ TraceError<ParseIntError> ]
            | _ | { "error parsing u64 integer from string"},
    }
}

impl FromStr for Timestamp {
    type Err = ParseTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let nanoseconds = u64::from_str(s).map_err(ParseTimestampError::parse_int)?;

        Ok(Timestamp::from_nanoseconds(nanoseconds))
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;
    use std::thread::sleep;

    use test_log::test;

    use super::{Expiry, Timestamp, ZERO_DURATION};

    #[test]
    fn test_timestamp_comparisons() {
        let nil_timestamp = Timestamp::from_nanoseconds(0);
        assert!(!nil_timestamp.is_set());

        let timestamp1 = Timestamp::from_nanoseconds(1);
        let timestamp2 = Timestamp::from_nanoseconds(2);

        assert!(!timestamp1.after(&nil_timestamp));
        assert!(!nil_timestamp.after(&timestamp1));
        assert!(timestamp2.after(&timestamp1));
        assert!(!timestamp1.after(&timestamp2));
        assert!(!timestamp1.after(&timestamp1));
    }

    #[test]
    fn test_timestamp_expiry() {
        let deadline = Timestamp::from_nanoseconds(1_000);

        assert_eq!(
            Timestamp::from_nanoseconds(999).check_expiry(&deadline),
            Expiry::NotExpired
        );
        assert_eq!(
            Timestamp::from_nanoseconds(1_000).check_expiry(&deadline),
            Expiry::Expired
        );
        assert_eq!(
            Timestamp::none().check_expiry(&deadline),
            Expiry::InvalidTimestamp
        );
        assert_eq!(
            deadline.check_expiry(&Timestamp::none()),
            Expiry::InvalidTimestamp
        );
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let time0 = Timestamp::none();
        let time1 = Timestamp::from_nanoseconds(100);
        let time2 = Timestamp::from_nanoseconds(150);
        let time3 = (time1 + Duration::from_nanos(50)).unwrap();

        assert_eq!(time3, time2);
        assert_eq!(time1.duration_since(&time0), None);
        assert_eq!(time0.duration_since(&time1), None);
        assert_eq!(time1.duration_since(&time2), None);
        assert_eq!(time2.duration_since(&time1), Some(Duration::from_nanos(50)));
        assert_eq!(time1.duration_since(&time1), Some(ZERO_DURATION));

        let max = Timestamp::from_nanoseconds(u64::MAX);
        assert!((max + Duration::from_nanos(1)).is_err());
    }

    #[test]
    fn test_timestamp_now_advances() {
        let time1 = Timestamp::now();
        sleep(Duration::from_millis(2));
        let time2 = Timestamp::now();

        assert!(time2.after(&time1));
    }

    #[test]
    fn test_timestamp_display_and_parse() {
        assert_eq!(Timestamp::none().to_string(), "NoTimestamp");

        let time: Timestamp = "1000000000".parse().unwrap();
        assert_eq!(time.nanoseconds(), 1_000_000_000);
        assert_eq!(time.to_string(), "Timestamp(1970-01-01T00:00:01+00:00)");

        assert!("nope".parse::<Timestamp>().is_err());
    }
}
