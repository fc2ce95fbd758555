//! Engine collaborator surface
//!
//! The timing engine is a black box to the oracle. These traits are the
//! whole contract: the engine is supplied to the scheduler by injection and
//! nothing reaches into its internals.

use std::time::Duration;

use crate::{Channels, DeclaredDuration, NodeId, NodeSnapshot, OracleResult, TickContext};

/// Reference point for a seek
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SeekOrigin {
    /// Offset is measured from the begin time
    #[default]
    BeginTime,
    /// Offset is measured from the end of the duration
    Duration,
}

/// Time manager driving the engine
pub trait TickSource {
    fn start(&mut self);
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn seek(&mut self, offset: Duration, origin: SeekOrigin);

    /// Advance the engine to `current_time` and deliver every notification
    /// this produces before returning.
    fn tick(&mut self, ctx: &TickContext, observer: &mut dyn ClockObserver) -> OracleResult<()>;

    fn current_time(&self) -> Duration;
    fn set_current_time(&mut self, time: Duration);

    /// Reject a tick step that a clock inside the engine cannot follow
    fn check_step(&self, _step: Duration) -> OracleResult<()> {
        Ok(())
    }
}

/// Inspection and subscription surface of the node hierarchy
pub trait ClockTree {
    /// Snapshot of a node; `None` if the node is unknown to the engine
    fn snapshot(&self, id: NodeId) -> Option<NodeSnapshot>;

    /// Direct children of a composite node, in declaration order
    fn children(&self, id: NodeId) -> Vec<NodeId>;

    fn subscribe(&mut self, id: NodeId, channels: Channels) -> OracleResult<()>;
    fn unsubscribe(&mut self, id: NodeId, channels: Channels);
}

/// Receiver of per-node notifications
pub trait ClockObserver {
    fn on_state_changed(&mut self, ctx: &TickContext, node: &NodeSnapshot);
    fn on_speed_changed(&mut self, ctx: &TickContext, node: &NodeSnapshot);
    fn on_time_changed(&mut self, ctx: &TickContext, node: &NodeSnapshot);
    fn on_completed(&mut self, ctx: &TickContext, node: &NodeSnapshot);
    fn on_remove_requested(&mut self, ctx: &TickContext, node: &NodeSnapshot);
}

/// Observer that drops everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl ClockObserver for NullObserver {
    fn on_state_changed(&mut self, _ctx: &TickContext, _node: &NodeSnapshot) {}
    fn on_speed_changed(&mut self, _ctx: &TickContext, _node: &NodeSnapshot) {}
    fn on_time_changed(&mut self, _ctx: &TickContext, _node: &NodeSnapshot) {}
    fn on_completed(&mut self, _ctx: &TickContext, _node: &NodeSnapshot) {}
    fn on_remove_requested(&mut self, _ctx: &TickContext, _node: &NodeSnapshot) {}
}

/// Externally supplied time source for a synchronized node
pub trait ExternalClock {
    /// Current synchronized time; may be called more than once per tick
    fn current_time(&mut self, ctx: &TickContext) -> Duration;

    /// Duration the node should run for, as resolved by the clock
    fn duration(&self) -> DeclaredDuration;

    /// Fixed amount the clock advances per tick, if it steps on its own
    fn step(&self) -> Option<Duration> {
        None
    }

    fn set_begin_time(&mut self, begin: Option<Duration>);

    fn on_stopped(&mut self);

    /// Engine speed changed (pause/resume); resynchronize to `requested`
    fn on_speed_changed(&mut self, requested: Option<Duration>, speed: Option<f64>);

    /// Engine seeked; resynchronize to `requested`
    fn on_discontinuous_jump(&mut self, requested: Option<Duration>, speed: Option<f64>);
}
