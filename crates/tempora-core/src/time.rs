//! Time primitives for the TEMPORA oracle
//!
//! Simulated time is discrete:
//! - Tick: the scheduler's current simulated millisecond
//! - TickContext: the tick threaded through every engine, adapter and
//!   accumulator call made while that tick is being processed
//! - DeclaredDuration: a node's duration as declared (automatic, finite, forever)

use std::fmt;
use std::time::Duration;

/// Simulated tick, in milliseconds since the start of a run
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        Tick(millis)
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Next tick `step` milliseconds later, or `None` on overflow
    #[inline]
    pub fn checked_add(self, step: u64) -> Option<Self> {
        self.0.checked_add(step).map(Tick)
    }
}

impl fmt::Debug for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tick({}ms)", self.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-tick context handed to every collaborator invoked during one tick.
///
/// Replaces a process-wide "current tick": whoever needs the tick receives it
/// explicitly, so two runs never observe each other's time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickContext {
    tick: Tick,
}

impl TickContext {
    #[inline]
    pub fn new(tick: Tick) -> Self {
        TickContext { tick }
    }

    #[inline]
    pub fn tick(&self) -> Tick {
        self.tick
    }
}

/// Duration as declared on a timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DeclaredDuration {
    /// Resolve from the natural duration of the node
    #[default]
    Automatic,
    /// Fixed length
    Finite(Duration),
    /// Never ends
    Forever,
}

impl DeclaredDuration {
    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        DeclaredDuration::Finite(Duration::from_millis(millis))
    }

    #[inline]
    pub fn is_automatic(self) -> bool {
        matches!(self, DeclaredDuration::Automatic)
    }

    /// Fall back to `natural` when automatic; an automatic natural duration
    /// resolves to `Forever`.
    pub fn resolve(self, natural: DeclaredDuration) -> DeclaredDuration {
        match self {
            DeclaredDuration::Automatic => match natural {
                DeclaredDuration::Automatic => DeclaredDuration::Forever,
                other => other,
            },
            other => other,
        }
    }

    /// Finite length, if any
    #[inline]
    pub fn finite(self) -> Option<Duration> {
        match self {
            DeclaredDuration::Finite(d) => Some(d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_ordering() {
        let t1 = Tick::from_millis(10);
        let t2 = t1.checked_add(10).unwrap();

        assert!(t2 > t1);
        assert_eq!(t2.as_millis(), 20);
        assert_eq!(t2.as_duration(), Duration::from_millis(20));
        assert_eq!(t2.to_string(), "20");
    }

    #[test]
    fn test_tick_overflow() {
        assert_eq!(Tick(u64::MAX).checked_add(1), None);
    }

    #[test]
    fn test_duration_resolution() {
        let natural = DeclaredDuration::from_millis(250);

        assert_eq!(DeclaredDuration::Automatic.resolve(natural), natural);
        assert_eq!(
            DeclaredDuration::Automatic.resolve(DeclaredDuration::Automatic),
            DeclaredDuration::Forever
        );
        assert_eq!(
            DeclaredDuration::from_millis(100).resolve(natural),
            DeclaredDuration::from_millis(100)
        );
        assert_eq!(DeclaredDuration::Forever.resolve(natural).finite(), None);
    }

    proptest::proptest! {
        #[test]
        fn prop_resolution_never_automatic(declared in 0u64..5_000, natural in 0u64..5_000, pick in 0u8..3) {
            let declared = match pick {
                0 => DeclaredDuration::Automatic,
                1 => DeclaredDuration::from_millis(declared),
                _ => DeclaredDuration::Forever,
            };
            let resolved = declared.resolve(DeclaredDuration::from_millis(natural));
            proptest::prop_assert!(!resolved.is_automatic());
            proptest::prop_assert_eq!(resolved.resolve(DeclaredDuration::Automatic), resolved);
        }
    }
}
