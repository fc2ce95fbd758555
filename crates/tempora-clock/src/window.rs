//! Slip window: the interval during which the adapter withholds time

use std::time::Duration;

use tempora_core::{OracleError, OracleResult};

/// Stall interval, relative to a node's begin time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SlipWindow {
    /// Offset from begin time at which the stall starts
    pub start_offset: Duration,
    /// Length of the stall
    pub duration: Duration,
}

impl SlipWindow {
    /// No stall at all
    pub const NONE: SlipWindow = SlipWindow {
        start_offset: Duration::ZERO,
        duration: Duration::ZERO,
    };

    pub fn new(start_offset: Duration, duration: Duration) -> Self {
        SlipWindow {
            start_offset,
            duration,
        }
    }

    /// Build from millisecond values as test cases declare them.
    /// Negative or non-finite values are a configuration error.
    pub fn from_millis(start_offset_ms: f64, duration_ms: f64) -> OracleResult<Self> {
        Ok(SlipWindow {
            start_offset: millis_to_duration("slip start offset", start_offset_ms)?,
            duration: millis_to_duration("slip duration", duration_ms)?,
        })
    }

    /// Absolute (start, end) bounds for a node that began at `begin`
    pub fn bounds(&self, begin: Duration) -> (Duration, Duration) {
        let start = begin.saturating_add(self.start_offset);
        (start, start.saturating_add(self.duration))
    }

    /// Strictly inside the open interval (start, end)
    pub fn contains(&self, begin: Duration, t: Duration) -> bool {
        let (start, end) = self.bounds(begin);
        t > start && t < end
    }
}

fn millis_to_duration(what: &str, ms: f64) -> OracleResult<Duration> {
    if !ms.is_finite() || ms < 0.0 {
        return Err(OracleError::config(format!("{} must be a non-negative number of milliseconds, got {}", what, ms)));
    }
    Ok(Duration::from_secs_f64(ms / 1000.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        let window = SlipWindow::from_millis(100.0, 50.0).unwrap();
        let (start, end) = window.bounds(Duration::from_millis(20));

        assert_eq!(start, Duration::from_millis(120));
        assert_eq!(end, Duration::from_millis(170));
    }

    #[test]
    fn test_window_is_open_interval() {
        let window = SlipWindow::from_millis(100.0, 50.0).unwrap();
        let begin = Duration::ZERO;

        assert!(!window.contains(begin, Duration::from_millis(100)));
        assert!(window.contains(begin, Duration::from_millis(110)));
        assert!(window.contains(begin, Duration::from_millis(140)));
        assert!(!window.contains(begin, Duration::from_millis(150)));
    }

    #[test]
    fn test_empty_window_never_contains() {
        for ms in [0, 1, 100] {
            assert!(!SlipWindow::NONE.contains(Duration::ZERO, Duration::from_millis(ms)));
        }
    }

    #[test]
    fn test_negative_values_rejected() {
        assert!(matches!(
            SlipWindow::from_millis(100.0, -1.0),
            Err(OracleError::Configuration(_))
        ));
        assert!(SlipWindow::from_millis(-5.0, 10.0).is_err());
        assert!(SlipWindow::from_millis(f64::NAN, 10.0).is_err());
    }
}
