//! Clock node identity and observable state
//!
//! Nodes are owned by the engine under test. The oracle only ever sees
//! read-only snapshots taken at notification time.

use std::fmt;
use std::time::Duration;

/// Engine node handle
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution state of a clock node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ClockState {
    #[default]
    Stopped,
    Active,
    Filling,
}

impl ClockState {
    /// Whether the node is taking part in the current tick
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, ClockState::Active | ClockState::Filling)
    }
}

impl fmt::Display for ClockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClockState::Stopped => "Stopped",
            ClockState::Active => "Active",
            ClockState::Filling => "Filling",
        };
        f.write_str(name)
    }
}

/// Read-only view of a node at one instant
#[derive(Clone, Debug, PartialEq, Default)]
pub struct NodeSnapshot {
    pub id: NodeId,
    /// Display name used in transcripts
    pub name: String,
    pub state: ClockState,
    /// Progress through the current iteration, in [0, 1]
    pub progress: Option<f64>,
    /// Signed global speed; `None` while the node has no defined speed
    pub speed: Option<f64>,
    pub paused: bool,
    /// 1-based iteration; `None` while stopped
    pub iteration: Option<u32>,
    /// Local time of the node
    pub current_time: Option<Duration>,
}

impl NodeSnapshot {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        NodeSnapshot {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Progress rendered the way transcripts print it (empty when undefined)
    pub fn progress_text(&self) -> String {
        match self.progress {
            Some(p) => format!("{}", p),
            None => String::new(),
        }
    }
}

/// Notification channels a node can be subscribed to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Channels(pub u8);

impl Channels {
    pub const NONE: Channels = Channels(0);

    pub const STATE: u8 = 0b0000_0001;
    pub const SPEED: u8 = 0b0000_0010;
    pub const TIME: u8 = 0b0000_0100;
    pub const COMPLETED: u8 = 0b0000_1000;
    pub const REMOVE_REQUESTED: u8 = 0b0001_0000;
    /// Observer-side repeat companion; engines deliver it over `TIME`
    pub const REPEAT: u8 = 0b0010_0000;

    pub const ALL: Channels = Channels(
        Self::STATE | Self::SPEED | Self::TIME | Self::COMPLETED | Self::REMOVE_REQUESTED,
    );

    #[inline]
    pub fn new(bits: u8) -> Self {
        Channels(bits)
    }

    #[inline]
    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn union(self, other: Channels) -> Channels {
        Channels(self.0 | other.0)
    }

    #[inline]
    pub fn without(self, other: Channels) -> Channels {
        Channels(self.0 & !other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels() {
        let c = Channels::new(Channels::STATE | Channels::TIME);

        assert!(c.contains(Channels::STATE));
        assert!(c.contains(Channels::TIME));
        assert!(!c.contains(Channels::SPEED));

        let all = c.union(Channels::ALL);
        assert_eq!(all, Channels::ALL);
        assert!(all.without(Channels::ALL).is_empty());
    }

    #[test]
    fn test_progress_text() {
        let mut node = NodeSnapshot::new(NodeId::new(3), "TimeNode");
        assert_eq!(node.progress_text(), "");

        node.progress = Some(0.25);
        assert_eq!(node.progress_text(), "0.25");

        node.progress = Some(1.0);
        assert_eq!(node.progress_text(), "1");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ClockState::Filling.to_string(), "Filling");
        assert!(ClockState::Active.is_running());
        assert!(!ClockState::Stopped.is_running());
    }
}
