//! Timeline declarations
//!
//! A `Timeline` is the static description of one node of the clock tree.
//! The engine flattens a declaration tree into its arena when it is built.

use std::fmt;
use std::time::Duration;

use tempora_core::{DeclaredDuration, ExternalClock};

/// How many iterations a node runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatBehavior {
    Count(u32),
    Forever,
}

impl Default for RepeatBehavior {
    fn default() -> Self {
        RepeatBehavior::Count(1)
    }
}

/// What a node does once its active period is over
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FillBehavior {
    /// Hold the final value (state Filling)
    #[default]
    HoldEnd,
    /// Return to Stopped
    Stop,
}

/// Declaration of one clock node and its children
pub struct Timeline {
    pub name: String,
    /// Offset into the parent's time; `None` waits for an interactive begin
    pub begin_time: Option<Duration>,
    pub duration: DeclaredDuration,
    pub repeat: RepeatBehavior,
    pub auto_reverse: bool,
    pub speed_ratio: f64,
    pub fill: FillBehavior,
    pub children: Vec<Timeline>,
    /// Synchronized time source; when present the node's position comes from it
    pub clock: Option<Box<dyn ExternalClock>>,
}

impl Timeline {
    pub fn new(name: impl Into<String>) -> Self {
        Timeline {
            name: name.into(),
            begin_time: Some(Duration::ZERO),
            duration: DeclaredDuration::Automatic,
            repeat: RepeatBehavior::default(),
            auto_reverse: false,
            speed_ratio: 1.0,
            fill: FillBehavior::default(),
            children: Vec::new(),
            clock: None,
        }
    }

    /// Leaf with a fixed duration in milliseconds
    pub fn leaf(name: impl Into<String>, duration_ms: u64) -> Self {
        Timeline::new(name).with_duration(DeclaredDuration::from_millis(duration_ms))
    }

    pub fn with_begin_ms(mut self, begin_ms: u64) -> Self {
        self.begin_time = Some(Duration::from_millis(begin_ms));
        self
    }

    /// Do not start on its own; wait for `SimEngine::begin`
    pub fn without_begin(mut self) -> Self {
        self.begin_time = None;
        self
    }

    pub fn with_duration(mut self, duration: DeclaredDuration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatBehavior) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_auto_reverse(mut self) -> Self {
        self.auto_reverse = true;
        self
    }

    pub fn with_speed_ratio(mut self, ratio: f64) -> Self {
        self.speed_ratio = ratio;
        self
    }

    pub fn with_fill(mut self, fill: FillBehavior) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_child(mut self, child: Timeline) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn ExternalClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Number of nodes in this declaration tree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Timeline::node_count).sum::<usize>()
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("name", &self.name)
            .field("begin_time", &self.begin_time)
            .field("duration", &self.duration)
            .field("repeat", &self.repeat)
            .field("auto_reverse", &self.auto_reverse)
            .field("speed_ratio", &self.speed_ratio)
            .field("fill", &self.fill)
            .field("children", &self.children)
            .field("clock", &self.clock.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let timeline = Timeline::new("Root");

        assert_eq!(timeline.begin_time, Some(Duration::ZERO));
        assert!(timeline.duration.is_automatic());
        assert_eq!(timeline.repeat, RepeatBehavior::Count(1));
        assert_eq!(timeline.fill, FillBehavior::HoldEnd);
        assert_eq!(timeline.speed_ratio, 1.0);
    }

    #[test]
    fn test_node_count() {
        let tree = Timeline::new("Root")
            .with_child(Timeline::leaf("A", 100))
            .with_child(Timeline::new("B").with_child(Timeline::leaf("C", 50)));

        assert_eq!(tree.node_count(), 4);
    }
}
