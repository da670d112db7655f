//! Calendar and time window models.
//!
//! Defines resource availability: working windows and blocked periods
//! (maintenance, holidays), in minute offsets from the scenario start.
//!
//! # Precedence
//! Blocked periods override windows. A minute is available iff it falls
//! within at least one window (or no windows are defined) AND not within
//! any blocked period.

use serde::{Deserialize, Serialize};

/// A time interval `[start, end)` in minute offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Interval start (minutes, inclusive).
    pub start: i64,
    /// Interval end (minutes, exclusive).
    pub end: i64,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Window length in minutes.
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Whether a minute offset falls within this window.
    #[inline]
    pub fn contains(&self, minute: i64) -> bool {
        minute >= self.start && minute < self.end
    }

    /// Whether `[start, start + duration)` lies entirely inside this window.
    #[inline]
    pub fn covers(&self, start: i64, duration: i64) -> bool {
        start >= self.start && start + duration <= self.end
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Resource availability calendar.
///
/// Empty `windows` means the resource is available around the clock,
/// subject to `blocked` periods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    /// Periods when the resource is available. Empty = always available.
    pub windows: Vec<TimeWindow>,
    /// Periods when the resource is unavailable (override windows).
    pub blocked: Vec<TimeWindow>,
}

impl Calendar {
    /// Creates a calendar with no constraints (24/7 availability).
    pub fn always_available() -> Self {
        Self::default()
    }

    /// Adds an availability window.
    pub fn with_window(mut self, start: i64, end: i64) -> Self {
        self.windows.push(TimeWindow::new(start, end));
        self
    }

    /// Adds a blocked period.
    pub fn with_blocked(mut self, start: i64, end: i64) -> Self {
        self.blocked.push(TimeWindow::new(start, end));
        self
    }

    /// Whether a minute offset is within working time.
    pub fn is_working_time(&self, minute: i64) -> bool {
        if self.blocked.iter().any(|w| w.contains(minute)) {
            return false;
        }
        self.windows.is_empty() || self.windows.iter().any(|w| w.contains(minute))
    }

    /// Whether an uninterrupted run of `duration` minutes can start at
    /// `start`: inside one window (if any are defined) and clear of every
    /// blocked period.
    pub fn fits(&self, start: i64, duration: i64) -> bool {
        let run = TimeWindow::new(start, start + duration);
        if self.blocked.iter().any(|b| b.overlaps(&run)) {
            return false;
        }
        self.windows.is_empty() || self.windows.iter().any(|w| w.covers(start, duration))
    }

    /// Earliest start `>= from` where an uninterrupted run of `duration`
    /// minutes fits, or `None` if no window can hold it.
    ///
    /// Candidate starts are `from` itself, window starts, and blocked-period
    /// ends; the earliest fitting candidate wins.
    pub fn next_fit(&self, from: i64, duration: i64) -> Option<i64> {
        if self.fits(from, duration) {
            return Some(from);
        }
        if !self.windows.is_empty() && !self.windows.iter().any(|w| w.duration() >= duration) {
            return None;
        }

        let mut candidates: Vec<i64> = Vec::new();
        for w in &self.windows {
            if w.start >= from {
                candidates.push(w.start);
            }
        }
        for b in &self.blocked {
            if b.end >= from {
                candidates.push(b.end);
            }
        }
        candidates.sort_unstable();
        candidates.dedup();

        // A candidate blocked by another period defers to that period's end,
        // which is itself in the candidate list, so a single pass suffices.
        candidates.into_iter().find(|&c| self.fits(c, duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_window() {
        let w = TimeWindow::new(100, 200);
        assert_eq!(w.duration(), 100);
        assert!(w.contains(100));
        assert!(w.contains(199));
        assert!(!w.contains(200)); // exclusive end
        assert!(w.covers(120, 80));
        assert!(!w.covers(150, 60));
    }

    #[test]
    fn test_always_available() {
        let cal = Calendar::always_available();
        assert!(cal.is_working_time(0));
        assert!(cal.fits(1_000_000, 480));
        assert_eq!(cal.next_fit(42, 60), Some(42));
    }

    #[test]
    fn test_shift_windows() {
        // Two 8-hour shifts: 08:00-16:00 and 20:00-04:00 (as offsets)
        let cal = Calendar::default()
            .with_window(480, 960)
            .with_window(1200, 1680);

        assert!(cal.is_working_time(500));
        assert!(!cal.is_working_time(1000));
        assert!(cal.fits(480, 480));
        assert!(!cal.fits(900, 120)); // would run past window end
        assert_eq!(cal.next_fit(1000, 60), Some(1200));
    }

    #[test]
    fn test_blocked_overrides() {
        let cal = Calendar::default()
            .with_window(0, 1000)
            .with_blocked(400, 500);

        assert!(cal.is_working_time(300));
        assert!(!cal.is_working_time(450));
        assert!(!cal.fits(350, 100)); // crosses into the blocked period
        assert_eq!(cal.next_fit(350, 100), Some(500));
    }

    #[test]
    fn test_blocked_only_calendar() {
        let cal = Calendar::always_available().with_blocked(100, 200);
        assert_eq!(cal.next_fit(150, 30), Some(200));
        assert_eq!(cal.next_fit(50, 30), Some(50));
        // Run longer than the gap before the block defers past it
        assert_eq!(cal.next_fit(90, 30), Some(200));
    }

    #[test]
    fn test_no_fit_possible() {
        let cal = Calendar::default().with_window(0, 100);
        assert_eq!(cal.next_fit(0, 200), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let cal = Calendar::default().with_window(0, 480).with_blocked(60, 90);
        let json = serde_json::to_string(&cal).unwrap();
        let back: Calendar = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cal);
    }
}
