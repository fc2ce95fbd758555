//! Canonical event vocabulary
//!
//! Raw engine notifications (state, speed, time, completed, remove-requested)
//! are mapped onto these kinds. The declaration order of `EventKind` is the
//! order in which bucketed reports are flushed.

use std::fmt;

use crate::Tick;

/// Semantic event kind derived from a raw notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Begun,
    Ended,
    /// Speed notification that was neither a reversal, pause nor resume
    SpeedInvalidated,
    Reversed,
    Repeated,
    Paused,
    Resumed,
    CurrentTimeInvalidated,
    Completed,
    RemoveRequested,
}

impl EventKind {
    /// All kinds, in flush order
    pub const ALL: [EventKind; 10] = [
        EventKind::Begun,
        EventKind::Ended,
        EventKind::SpeedInvalidated,
        EventKind::Reversed,
        EventKind::Repeated,
        EventKind::Paused,
        EventKind::Resumed,
        EventKind::CurrentTimeInvalidated,
        EventKind::Completed,
        EventKind::RemoveRequested,
    ];

    /// Header line emitted before a bucket in verify mode
    pub fn header(self) -> &'static str {
        match self {
            EventKind::Begun => "---------- CurrentStateInvalidated: Timeline Began",
            EventKind::Ended => "---------- CurrentStateInvalidated: Timeline Ended",
            EventKind::SpeedInvalidated => "---------- CurrentGlobalSpeedInvalidated",
            EventKind::Reversed => "---------- CurrentGlobalSpeedInvalidated: Timeline Reversed",
            EventKind::Repeated => "---------- CurrentTimeInvalidated: Timeline Repeated",
            EventKind::Paused => "---------- CurrentGlobalSpeedInvalidated: Timeline Paused",
            EventKind::Resumed => "---------- CurrentGlobalSpeedInvalidated: Timeline Resumed",
            EventKind::CurrentTimeInvalidated => "---------- CurrentTimeInvalidated",
            EventKind::Completed => "---------- Completed",
            EventKind::RemoveRequested => "---------- RemoveRequested",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One derived event, tagged with the tick it was delivered on
#[derive(Clone, Debug, PartialEq)]
pub struct EventRecord {
    pub tick: Tick,
    pub kind: EventKind,
    pub node_name: String,
    /// Extra detail, e.g. the progress carried by a time notification
    pub modifier: Option<String>,
}

impl EventRecord {
    pub fn new(tick: Tick, kind: EventKind, node_name: impl Into<String>) -> Self {
        EventRecord {
            tick,
            kind,
            node_name: node_name.into(),
            modifier: None,
        }
    }

    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifier = Some(modifier.into());
        self
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.tick, self.node_name, self.kind)?;
        if let Some(modifier) = &self.modifier {
            write!(f, " ({})", modifier)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_order_matches_declaration() {
        let mut sorted = EventKind::ALL;
        sorted.sort();
        assert_eq!(sorted, EventKind::ALL);
        assert_eq!(EventKind::ALL[2], EventKind::SpeedInvalidated);
        assert_eq!(EventKind::ALL[9], EventKind::RemoveRequested);
    }

    #[test]
    fn test_record_display() {
        let record = EventRecord::new(Tick(40), EventKind::CurrentTimeInvalidated, "TimeNode")
            .with_modifier("0.4");
        assert_eq!(record.to_string(), "[40] TimeNode: CurrentTimeInvalidated (0.4)");
    }
}
