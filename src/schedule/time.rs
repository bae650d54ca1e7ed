//! Time-of-day arithmetic for the daily chaos window.

use crate::error::{Result, TurmoilError};
use chrono::Timelike;
use std::fmt;
use std::time::Duration;

/// Length of one day
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// A point in the day, measured as the duration since local midnight.
///
/// Always `0 <= value < 24h`; every constructor reduces modulo one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(Duration);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(Duration::ZERO);

    /// Build from a duration since midnight, wrapping anything past 24h
    pub fn from_duration(since_midnight: Duration) -> Self {
        let nanos = since_midnight.as_nanos() % DAY.as_nanos();
        TimeOfDay(Duration::from_nanos(nanos as u64))
    }

    /// Build from hour/minute/second fields
    ///
    /// # Errors
    ///
    /// Returns `TurmoilError::Configuration` if any field is out of range.
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Result<Self> {
        if hours >= 24 || minutes >= 60 || seconds >= 60 {
            return Err(TurmoilError::Configuration(format!(
                "time {:02}:{:02}:{:02} is out of range",
                hours, minutes, seconds
            )));
        }
        let secs = u64::from(hours) * 3600 + u64::from(minutes) * 60 + u64::from(seconds);
        Ok(TimeOfDay(Duration::from_secs(secs)))
    }

    /// Parse an `"HH:MM"` string
    ///
    /// # Errors
    ///
    /// Returns `TurmoilError::Configuration` if the string is not two
    /// colon-separated integers within 00:00..=23:59.
    pub fn parse(input: &str) -> Result<Self> {
        let malformed =
            || TurmoilError::Configuration(format!("expected time as HH:MM, got {:?}", input));

        let (hours, minutes) = input.trim().split_once(':').ok_or_else(malformed)?;
        let hours: u32 = hours.parse().map_err(|_| malformed())?;
        let minutes: u32 = minutes.parse().map_err(|_| malformed())?;
        Self::from_hms(hours, minutes, 0)
    }

    /// Duration since midnight
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// How long from `self` until the next occurrence of `target`,
    /// wrapping through midnight. Zero when they are equal.
    pub fn until(self, target: TimeOfDay) -> Duration {
        if target >= self {
            target.0 - self.0
        } else {
            DAY - self.0 + target.0
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
        if s == 0 {
            write!(f, "{:02}:{:02}", h, m)
        } else {
            write!(f, "{:02}:{:02}:{:02}", h, m, s)
        }
    }
}

/// Source of the current time of day
pub trait Clock: Send + Sync {
    fn now(&self) -> TimeOfDay;
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeOfDay {
        let time = chrono::Local::now().time();
        // chrono encodes a leap second as nanos >= 1e9
        let nanos = time.nanosecond() % 1_000_000_000;
        TimeOfDay::from_duration(Duration::new(
            u64::from(time.num_seconds_from_midnight()),
            nanos,
        ))
    }
}

/// Clock driven by the tokio timer, so paused-time tests can simulate days
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct SimulatedClock {
    origin: tokio::time::Instant,
    base: Duration,
}

#[cfg(test)]
impl SimulatedClock {
    pub(crate) fn starting_at(start: TimeOfDay) -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            base: start.as_duration(),
        }
    }
}

#[cfg(test)]
impl Clock for SimulatedClock {
    fn now(&self) -> TimeOfDay {
        TimeOfDay::from_duration(self.base + self.origin.elapsed())
    }
}
