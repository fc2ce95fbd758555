//! Reference engine - deterministic clock tree
//!
//! Each tick the engine walks the tree in preorder:
//! 1. Take the parent's local time (the manager time for the root)
//! 2. Apply the interactive controls queued for the node
//! 3. Compute state, progress, iteration and speed
//! 4. Hand the node's local time to its children
//!
//! Notifications are derived afterwards by diffing every node's snapshot
//! against the previous tick, and delivered in preorder.

use std::time::Duration;

use tempora_core::{
    Channels, ClockObserver, ClockState, ClockTree, DeclaredDuration, ExternalClock, NodeId,
    NodeSnapshot, OracleError, OracleResult, SeekOrigin, TickContext, TickSource,
};

use crate::{FillBehavior, RepeatBehavior, Timeline};

/// Natural duration of a leaf that declares none
pub const DEFAULT_LEAF_DURATION: Duration = Duration::from_millis(1000);

/// Engine counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub ticks: u64,
    pub notifications: u64,
    pub controls_applied: u64,
}

/// Interactive control, applied at the next tick
#[derive(Clone, Copy, Debug, PartialEq)]
enum Control {
    Begin,
    Pause,
    Resume,
    Seek(Duration, SeekOrigin),
    Stop,
    Remove,
    SpeedRatio(f64),
}

/// Result of evaluating one node at one tick
#[derive(Clone, Copy, Debug, Default)]
struct Evaluation {
    state: ClockState,
    progress: Option<f64>,
    /// Local time within the current iteration (ms)
    local_ms: Option<f64>,
    speed: Option<f64>,
    iteration: Option<u32>,
    natural_end: bool,
}

struct SimNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    declared_duration: DeclaredDuration,
    /// Resolved length of one iteration
    simple: DeclaredDuration,
    repeat: RepeatBehavior,
    auto_reverse: bool,
    speed_ratio: f64,
    fill: FillBehavior,
    clock: Option<Box<dyn ExternalClock>>,

    /// Parent time at which elapsed time is zero
    anchor: Option<f64>,
    /// Elapsed parent time held while paused
    frozen: Option<f64>,
    forced_stop: bool,
    remove_requested: bool,
    pending: Vec<Control>,

    eval: Evaluation,
    snapshot: NodeSnapshot,
    subscriptions: Channels,
}

impl SimNode {
    fn segment_ms(&self) -> Option<f64> {
        let d = duration_to_ms(self.simple.finite()?);
        Some(if self.auto_reverse { d * 2.0 } else { d })
    }

    /// Length of the whole active period in the node's own time
    fn active_ms(&self) -> Option<f64> {
        let segment = self.segment_ms()?;
        match self.repeat {
            RepeatBehavior::Count(n) => Some(segment * n as f64),
            RepeatBehavior::Forever => None,
        }
    }
}

/// Deterministic clock-tree engine
pub struct SimEngine {
    nodes: Vec<SimNode>,
    current_time: Duration,
    started: bool,
    stats: EngineStats,
}

impl SimEngine {
    /// Flatten `root` into the arena; the root gets `NodeId::ROOT`
    pub fn new(root: Timeline) -> OracleResult<Self> {
        let mut engine = SimEngine {
            nodes: Vec::with_capacity(root.node_count()),
            current_time: Duration::ZERO,
            started: false,
            stats: EngineStats::default(),
        };
        engine.insert(root, None)?;
        engine.resolve_durations();

        tracing::debug!(nodes = engine.nodes.len(), "reference engine built");
        Ok(engine)
    }

    fn insert(&mut self, timeline: Timeline, parent: Option<NodeId>) -> OracleResult<NodeId> {
        if !timeline.speed_ratio.is_finite() || timeline.speed_ratio <= 0.0 {
            return Err(OracleError::config(format!(
                "speed ratio of {} must be positive, got {}",
                timeline.name, timeline.speed_ratio
            )));
        }
        if timeline.repeat == RepeatBehavior::Count(0) {
            return Err(OracleError::config(format!("repeat count of {} must be positive", timeline.name)));
        }

        let id = NodeId::new(self.nodes.len() as u32);
        let mut clock = timeline.clock;
        if let Some(clock) = clock.as_mut() {
            clock.set_begin_time(timeline.begin_time);
        }

        self.nodes.push(SimNode {
            snapshot: NodeSnapshot::new(id, timeline.name.clone()),
            name: timeline.name,
            parent,
            children: Vec::new(),
            declared_duration: timeline.duration,
            simple: DeclaredDuration::Forever,
            repeat: timeline.repeat,
            auto_reverse: timeline.auto_reverse,
            speed_ratio: timeline.speed_ratio,
            fill: timeline.fill,
            clock,
            anchor: timeline.begin_time.map(duration_to_ms),
            frozen: None,
            forced_stop: false,
            remove_requested: false,
            pending: Vec::new(),
            eval: Evaluation::default(),
            subscriptions: Channels::NONE,
        });

        for child in timeline.children {
            let child_id = self.insert(child, Some(id))?;
            self.nodes[id.index()].children.push(child_id);
        }
        Ok(id)
    }

    /// Children come after their parent in the arena, so a reverse sweep
    /// sees every child resolved before its parent.
    fn resolve_durations(&mut self) {
        for index in (0..self.nodes.len()).rev() {
            let natural = match &self.nodes[index].clock {
                Some(clock) => clock.duration(),
                None if self.nodes[index].children.is_empty() => DeclaredDuration::Finite(DEFAULT_LEAF_DURATION),
                None => self.group_natural_duration(index),
            };
            let node = &mut self.nodes[index];
            node.simple = node.declared_duration.resolve(natural);
        }
    }

    /// Latest end of any child that has a begin time
    fn group_natural_duration(&self, index: usize) -> DeclaredDuration {
        let mut end = 0.0f64;
        for child in &self.nodes[index].children {
            let child = &self.nodes[child.index()];
            let begin = match child.anchor {
                Some(begin) => begin,
                None => continue,
            };
            match child.active_ms() {
                Some(active) => end = end.max(begin + active / child.speed_ratio),
                None => return DeclaredDuration::Forever,
            }
        }
        DeclaredDuration::Finite(ms_to_duration(end))
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First node with the given name, in preorder
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| NodeId::new(i as u32))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    /// Resolved length of one iteration of a node
    pub fn simple_duration(&self, id: NodeId) -> Option<DeclaredDuration> {
        self.nodes.get(id.index()).map(|n| n.simple)
    }

    fn queue(&mut self, id: NodeId, control: Control) -> OracleResult<()> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or_else(|| OracleError::config(format!("unknown node {}", id)))?;
        node.pending.push(control);
        Ok(())
    }

    /// Start (or restart) a node at the next tick
    pub fn begin(&mut self, id: NodeId) -> OracleResult<()> {
        self.queue(id, Control::Begin)
    }

    pub fn pause(&mut self, id: NodeId) -> OracleResult<()> {
        self.queue(id, Control::Pause)
    }

    pub fn resume(&mut self, id: NodeId) -> OracleResult<()> {
        self.queue(id, Control::Resume)
    }

    /// Move a node to `offset` in its active period
    pub fn seek(&mut self, id: NodeId, offset: Duration, origin: SeekOrigin) -> OracleResult<()> {
        self.queue(id, Control::Seek(offset, origin))
    }

    pub fn stop(&mut self, id: NodeId) -> OracleResult<()> {
        self.queue(id, Control::Stop)
    }

    /// Ask for the node to be removed; it stops and reports RemoveRequested
    pub fn remove(&mut self, id: NodeId) -> OracleResult<()> {
        self.queue(id, Control::Remove)
    }

    pub fn set_speed_ratio(&mut self, id: NodeId, ratio: f64) -> OracleResult<()> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(OracleError::config(format!("speed ratio must be positive, got {}", ratio)));
        }
        self.queue(id, Control::SpeedRatio(ratio))
    }

    fn apply_control(&mut self, index: usize, control: Control, parent_ms: f64) {
        self.stats.controls_applied += 1;
        let node = &mut self.nodes[index];
        tracing::debug!(node = %node.name, ?control, parent_ms, "applying control");

        let elapsed = node.frozen.or(node.anchor.map(|a| parent_ms - a));
        let running = node.anchor.is_some() && !node.forced_stop;

        match control {
            Control::Begin => {
                node.anchor = Some(parent_ms);
                node.frozen = None;
                node.forced_stop = false;
                node.remove_requested = false;
                if let Some(clock) = node.clock.as_mut() {
                    clock.set_begin_time(Some(ms_to_duration(parent_ms)));
                }
            }
            Control::Pause => {
                if running && node.frozen.is_none() {
                    node.frozen = elapsed;
                    let local = node.eval.local_ms.map(ms_to_duration);
                    if let Some(clock) = node.clock.as_mut() {
                        clock.on_speed_changed(local, Some(0.0));
                    }
                }
            }
            Control::Resume => {
                if let Some(frozen) = node.frozen.take() {
                    node.anchor = Some(parent_ms - frozen);
                    let local = node.eval.local_ms.map(ms_to_duration);
                    let speed = node.speed_ratio;
                    if let Some(clock) = node.clock.as_mut() {
                        clock.on_speed_changed(local, Some(speed));
                    }
                }
            }
            Control::Seek(offset, origin) => {
                if !running {
                    return;
                }
                let offset_ms = duration_to_ms(offset);
                let target = match origin {
                    SeekOrigin::BeginTime => offset_ms,
                    SeekOrigin::Duration => match node.active_ms() {
                        Some(active) => (active - offset_ms).max(0.0),
                        None => return,
                    },
                };
                let elapsed = target / node.speed_ratio;
                node.anchor = Some(parent_ms - elapsed);
                if node.frozen.is_some() {
                    node.frozen = Some(elapsed);
                }
                let speed = if node.frozen.is_some() { 0.0 } else { node.speed_ratio };
                if let Some(clock) = node.clock.as_mut() {
                    clock.on_discontinuous_jump(Some(ms_to_duration(target)), Some(speed));
                }
            }
            Control::Stop | Control::Remove => {
                node.forced_stop = true;
                node.frozen = None;
                if control == Control::Remove {
                    node.remove_requested = true;
                }
                if let Some(clock) = node.clock.as_mut() {
                    clock.on_stopped();
                }
            }
            Control::SpeedRatio(ratio) => {
                if let Some(elapsed) = elapsed {
                    let rescaled = elapsed * node.speed_ratio / ratio;
                    match node.frozen {
                        Some(_) => node.frozen = Some(rescaled),
                        None => node.anchor = Some(parent_ms - rescaled),
                    }
                }
                node.speed_ratio = ratio;
            }
        }
    }

    fn evaluate(&mut self, index: usize, parent_ms: Option<f64>, parent_speed: Option<f64>, ctx: &TickContext) -> Evaluation {
        let node = &mut self.nodes[index];
        let stopped = Evaluation::default();

        let parent_ms = match parent_ms {
            Some(p) => p,
            None => return stopped,
        };
        let anchor = match node.anchor {
            Some(a) if !node.forced_stop => a,
            _ => return stopped,
        };
        let elapsed = node.frozen.unwrap_or(parent_ms - anchor);
        if elapsed < 0.0 {
            return stopped;
        }

        let active = match node.clock.as_mut() {
            Some(clock) => duration_to_ms(clock.current_time(ctx)),
            None => elapsed * node.speed_ratio,
        };
        let paused = node.frozen.is_some();

        if let Some(total) = node.active_ms() {
            if active >= total {
                return match node.fill {
                    FillBehavior::Stop => Evaluation {
                        natural_end: true,
                        ..stopped
                    },
                    FillBehavior::HoldEnd => {
                        let simple = node.segment_ms().map(|s| if node.auto_reverse { s / 2.0 } else { s });
                        let progress = if node.auto_reverse { 0.0 } else { 1.0 };
                        let iteration = match node.repeat {
                            RepeatBehavior::Count(n) => n,
                            RepeatBehavior::Forever => 1,
                        };
                        Evaluation {
                            state: ClockState::Filling,
                            progress: Some(progress),
                            local_ms: simple.map(|d| d * progress),
                            speed: Some(0.0),
                            iteration: Some(iteration),
                            natural_end: true,
                        }
                    }
                };
            }
        }

        let (progress, local_ms, iteration, reversing) = match node.simple.finite() {
            Some(simple) => {
                let simple = duration_to_ms(simple);
                let segment = if node.auto_reverse { simple * 2.0 } else { simple };
                if segment <= 0.0 {
                    (1.0, 0.0, 1, false)
                } else {
                    let completed = (active / segment).floor();
                    let within = active - completed * segment;
                    if within < simple {
                        (within / simple, within, completed as u32 + 1, false)
                    } else {
                        let back = 2.0 * simple - within;
                        (back / simple, back, completed as u32 + 1, true)
                    }
                }
            }
            None => (0.0, active, 1, false),
        };

        let speed = if paused {
            0.0
        } else {
            let signed = node.speed_ratio * parent_speed.unwrap_or(1.0);
            if reversing {
                -signed
            } else {
                signed
            }
        };

        Evaluation {
            state: ClockState::Active,
            progress: Some(progress),
            local_ms: Some(local_ms),
            speed: Some(speed),
            iteration: Some(iteration),
            natural_end: false,
        }
    }

    /// Evaluate a subtree rooted at `index`, preorder
    fn advance(&mut self, index: usize, parent_ms: Option<f64>, parent_speed: Option<f64>, ctx: &TickContext) {
        let controls = std::mem::take(&mut self.nodes[index].pending);
        for control in controls {
            match parent_ms {
                Some(p) => self.apply_control(index, control, p),
                None => tracing::debug!(node = %self.nodes[index].name, ?control, "control dropped, parent not running"),
            }
        }

        let eval = self.evaluate(index, parent_ms, parent_speed, ctx);
        self.nodes[index].eval = eval;

        let children = self.nodes[index].children.clone();
        for child in children {
            self.advance(child.index(), eval.local_ms, eval.speed, ctx);
        }
    }

    fn deliver(&mut self, ctx: &TickContext, observer: &mut dyn ClockObserver) {
        for node in self.nodes.iter_mut() {
            let eval = node.eval;
            let previous = node.snapshot.clone();
            let next = NodeSnapshot {
                id: previous.id,
                name: node.name.clone(),
                state: eval.state,
                progress: eval.progress,
                speed: eval.speed,
                paused: node.frozen.is_some() && eval.state == ClockState::Active,
                iteration: eval.iteration,
                current_time: eval.local_ms.map(ms_to_duration),
            };
            let channels = node.subscriptions;
            let mut fired = 0u64;

            if next.state != previous.state && channels.contains(Channels::STATE) {
                observer.on_state_changed(ctx, &next);
                fired += 1;
            }
            if (next.speed != previous.speed || next.paused != previous.paused) && channels.contains(Channels::SPEED) {
                observer.on_speed_changed(ctx, &next);
                fired += 1;
            }
            if (next.current_time != previous.current_time || next.state != previous.state)
                && channels.contains(Channels::TIME)
            {
                observer.on_time_changed(ctx, &next);
                fired += 1;
            }
            if previous.state == ClockState::Active
                && next.state != ClockState::Active
                && eval.natural_end
                && channels.contains(Channels::COMPLETED)
            {
                observer.on_completed(ctx, &next);
                fired += 1;
            }
            if node.remove_requested {
                node.remove_requested = false;
                if channels.contains(Channels::REMOVE_REQUESTED) {
                    observer.on_remove_requested(ctx, &next);
                    fired += 1;
                }
            }

            self.stats.notifications += fired;
            node.snapshot = next;
        }
    }
}

impl TickSource for SimEngine {
    fn start(&mut self) {
        self.started = true;
    }

    fn stop(&mut self) {
        self.nodes[NodeId::ROOT.index()].pending.push(Control::Stop);
    }

    fn pause(&mut self) {
        self.nodes[NodeId::ROOT.index()].pending.push(Control::Pause);
    }

    fn resume(&mut self) {
        self.nodes[NodeId::ROOT.index()].pending.push(Control::Resume);
    }

    fn seek(&mut self, offset: Duration, origin: SeekOrigin) {
        self.nodes[NodeId::ROOT.index()].pending.push(Control::Seek(offset, origin));
    }

    fn tick(&mut self, ctx: &TickContext, observer: &mut dyn ClockObserver) -> OracleResult<()> {
        self.stats.ticks += 1;
        let manager_ms = if self.started {
            Some(duration_to_ms(self.current_time))
        } else {
            None
        };
        tracing::trace!(tick = ctx.tick().as_millis(), started = self.started, "engine tick");

        self.advance(NodeId::ROOT.index(), manager_ms, Some(1.0), ctx);
        self.deliver(ctx, observer);
        Ok(())
    }

    fn current_time(&self) -> Duration {
        self.current_time
    }

    fn set_current_time(&mut self, time: Duration) {
        self.current_time = time;
    }

    fn check_step(&self, step: Duration) -> OracleResult<()> {
        for node in &self.nodes {
            let clock_step = match node.clock.as_ref().and_then(|c| c.step()) {
                Some(s) => s,
                None => continue,
            };
            if clock_step != step {
                return Err(OracleError::config(format!(
                    "clock of {} steps {} ms per tick but the schedule steps {} ms",
                    node.name,
                    clock_step.as_millis(),
                    step.as_millis()
                )));
            }
        }
        Ok(())
    }
}

impl ClockTree for SimEngine {
    fn snapshot(&self, id: NodeId) -> Option<NodeSnapshot> {
        self.nodes.get(id.index()).map(|n| n.snapshot.clone())
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id.index())
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn subscribe(&mut self, id: NodeId, channels: Channels) -> OracleResult<()> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or_else(|| OracleError::config(format!("cannot subscribe to unknown node {}", id)))?;
        node.subscriptions = node.subscriptions.union(channels);
        Ok(())
    }

    fn unsubscribe(&mut self, id: NodeId, channels: Channels) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.subscriptions = node.subscriptions.without(channels);
        }
    }
}

fn duration_to_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

fn ms_to_duration(ms: f64) -> Duration {
    Duration::from_nanos((ms.max(0.0) * 1_000_000.0).round() as u64)
}
