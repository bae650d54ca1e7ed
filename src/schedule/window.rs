//! The daily window during which chaos timers may run.

use super::time::TimeOfDay;
use crate::error::Result;
use std::fmt;
use std::time::Duration;

/// A daily `[start, stop)` interval; overnight when `start > stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: TimeOfDay,
    stop: TimeOfDay,
}

/// Where the clock sits relative to the window at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Window is open now; timers start immediately
    Open { close_in: Duration },
    /// Window is closed; wait this long for it to open
    Closed { open_in: Duration },
}

impl Window {
    pub fn new(start: TimeOfDay, stop: TimeOfDay) -> Self {
        Self { start, stop }
    }

    /// Parse a window from two `"HH:MM"` strings
    pub fn parse(start: &str, stop: &str) -> Result<Self> {
        Ok(Self::new(TimeOfDay::parse(start)?, TimeOfDay::parse(stop)?))
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn stop(&self) -> TimeOfDay {
        self.stop
    }

    /// The active interval spans midnight
    pub fn is_overnight(&self) -> bool {
        self.start > self.stop
    }

    /// How long the window stays open each day
    pub fn length(&self) -> Duration {
        self.start.until(self.stop)
    }

    /// Classify `now` for startup alignment.
    ///
    /// Overnight windows are open strictly after `start` or strictly before
    /// `stop`. Same-day windows are open on `[start, stop]`.
    pub fn align(&self, now: TimeOfDay) -> Alignment {
        let open = if self.is_overnight() {
            now > self.start || now < self.stop
        } else {
            now >= self.start && now <= self.stop
        };

        if open {
            Alignment::Open {
                close_in: now.until(self.stop),
            }
        } else {
            Alignment::Closed {
                open_in: now.until(self.start),
            }
        }
    }

    /// Whether `now` falls inside the window, boundaries included
    #[cfg(test)]
    pub(crate) fn contains(&self, now: TimeOfDay) -> bool {
        if self.is_overnight() {
            now >= self.start || now <= self.stop
        } else {
            now >= self.start && now <= self.stop
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tod(s: &str) -> TimeOfDay {
        TimeOfDay::parse(s).unwrap()
    }

    fn hours(h: u64) -> Duration {
        Duration::from_secs(h * 3600)
    }

    #[test]
    fn test_overnight_detection() {
        assert!(Window::parse("22:00", "06:00").unwrap().is_overnight());
        assert!(!Window::parse("10:00", "16:00").unwrap().is_overnight());
    }

    #[test]
    fn test_window_length() {
        assert_eq!(Window::parse("22:00", "06:00").unwrap().length(), hours(8));
        assert_eq!(Window::parse("10:00", "16:00").unwrap().length(), hours(6));
    }

    #[test]
    fn test_overnight_open_before_midnight() {
        let window = Window::parse("22:00", "06:00").unwrap();
        assert_eq!(
            window.align(tod("23:00")),
            Alignment::Open { close_in: hours(7) }
        );
    }

    #[test]
    fn test_overnight_open_after_midnight() {
        let window = Window::parse("22:00", "06:00").unwrap();
        assert_eq!(
            window.align(tod("02:00")),
            Alignment::Open { close_in: hours(4) }
        );
    }

    #[test]
    fn test_overnight_closed_during_day() {
        let window = Window::parse("22:00", "06:00").unwrap();
        assert_eq!(
            window.align(tod("10:00")),
            Alignment::Closed { open_in: hours(12) }
        );
    }

    #[test]
    fn test_same_day_open() {
        let window = Window::parse("10:00", "16:00").unwrap();
        assert_eq!(
            window.align(tod("12:00")),
            Alignment::Open { close_in: hours(4) }
        );
    }

    #[test]
    fn test_same_day_before_start() {
        let window = Window::parse("10:00", "16:00").unwrap();
        assert_eq!(
            window.align(tod("08:00")),
            Alignment::Closed { open_in: hours(2) }
        );
    }

    #[test]
    fn test_same_day_after_stop_waits_for_tomorrow() {
        let window = Window::parse("10:00", "16:00").unwrap();
        assert_eq!(
            window.align(tod("18:00")),
            Alignment::Closed { open_in: hours(16) }
        );
    }

    #[test]
    fn test_boundaries() {
        let day = Window::parse("10:00", "16:00").unwrap();
        assert!(matches!(day.align(tod("10:00")), Alignment::Open { .. }));
        assert_eq!(
            day.align(tod("16:00")),
            Alignment::Open {
                close_in: Duration::ZERO
            }
        );

        let night = Window::parse("22:00", "06:00").unwrap();
        assert_eq!(
            night.align(tod("22:00")),
            Alignment::Closed {
                open_in: Duration::ZERO
            }
        );
        assert_eq!(
            night.align(tod("06:00")),
            Alignment::Closed { open_in: hours(16) }
        );
    }

    #[test]
    fn test_contains() {
        let night = Window::parse("22:00", "06:00").unwrap();
        assert!(night.contains(tod("23:59")));
        assert!(night.contains(tod("00:00")));
        assert!(!night.contains(tod("12:00")));

        let day = Window::parse("10:00", "16:00").unwrap();
        assert!(day.contains(tod("16:00")));
        assert!(!day.contains(tod("09:59")));
    }

    #[test]
    fn test_display() {
        let window = Window::parse("22:00", "06:30").unwrap();
        assert_eq!(window.to_string(), "22:00-06:30");
    }
}
