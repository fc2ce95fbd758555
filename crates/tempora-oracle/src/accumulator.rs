//! Event accumulator
//!
//! Observes engine notifications, derives semantic event kinds and tags each
//! with the tick it was delivered on. In legacy mode every event is written
//! to the transcript as it happens; in verify mode events are kept in
//! per-kind buckets and emitted, sorted, when the accumulator is flushed, so
//! the delivery order within a tick does not matter.
//!
//! A speed sample counts as `Reversed` when its sign differs from the last
//! non-zero sign, or when it moves backward straight out of a zero speed
//! (resuming at negative speed). Moving forward out of zero is never a
//! reversal, and neither is the first sample of a node.

use std::collections::{BTreeMap, HashMap};

use tempora_core::{
    Channels, ClockObserver, ClockState, ClockTree, EventKind, EventRecord, NodeId, NodeSnapshot,
    OracleResult, Tick, TickContext,
};

/// Stand-in for an undefined global speed
pub const UNDEFINED_SPEED: f64 = 99999.0;

/// How events are written
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AccumulatorMode {
    /// Literal lines in the transcript, in delivery order
    #[default]
    Legacy,
    /// Sorted tick buckets appended on flush
    Verify,
}

#[derive(Clone, Copy, Debug, Default)]
struct NodeTrack {
    /// Last non-zero sign
    last_sign: Option<i8>,
    /// Sign of the previous sample, zero included
    last_seen: Option<i8>,
    paused: bool,
    max_iteration: u32,
}

/// Collects the notifications of one run
#[derive(Debug, Default)]
pub struct EventAccumulator {
    mode: AccumulatorMode,
    transcript: String,
    buckets: BTreeMap<EventKind, Vec<Tick>>,
    records: Vec<EventRecord>,
    tracks: HashMap<NodeId, NodeTrack>,
    attachments: BTreeMap<NodeId, Channels>,
}

impl EventAccumulator {
    pub fn new(mode: AccumulatorMode) -> Self {
        EventAccumulator {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> AccumulatorMode {
        self.mode
    }

    /// Subscribe to `node` on `channels`. `Channels::REPEAT` rides on the
    /// engine's time channel.
    pub fn attach<T: ClockTree + ?Sized>(&mut self, tree: &mut T, node: NodeId, channels: Channels) -> OracleResult<()> {
        tree.subscribe(node, engine_channels(channels))?;
        let entry = self.attachments.entry(node).or_default();
        *entry = entry.union(channels);
        Ok(())
    }

    /// Opt `node` into repeat detection
    pub fn attach_repeat<T: ClockTree + ?Sized>(&mut self, tree: &mut T, node: NodeId) -> OracleResult<()> {
        self.attach(tree, node, Channels::new(Channels::REPEAT))
    }

    pub fn detach<T: ClockTree + ?Sized>(&mut self, tree: &mut T, node: NodeId) {
        if let Some(channels) = self.attachments.remove(&node) {
            tree.unsubscribe(node, engine_channels(channels));
        }
    }

    pub fn detach_all<T: ClockTree + ?Sized>(&mut self, tree: &mut T) {
        for (node, channels) in std::mem::take(&mut self.attachments) {
            tree.unsubscribe(node, engine_channels(channels));
        }
    }

    fn channels(&self, node: NodeId) -> Channels {
        self.attachments.get(&node).copied().unwrap_or_default()
    }

    /// Tick marker line
    pub fn mark_tick(&mut self, tick: Tick) {
        self.transcript.push_str(&format!("Processing time {} ms\n", tick));
    }

    pub fn sample_progress(&mut self, node: &NodeSnapshot) {
        self.transcript
            .push_str(&format!("  {}: Progress = {}\n", node.name, node.progress_text()));
    }

    pub fn render_state(&mut self, node: &NodeSnapshot) {
        self.transcript.push_str(&format!(
            "State of {} :  , Progress : {} , CurrentState : {}\n",
            node.name,
            node.progress_text(),
            node.state
        ));
    }

    /// Append a free-form line
    pub fn note(&mut self, line: impl AsRef<str>) {
        self.transcript.push_str(line.as_ref());
        self.transcript.push('\n');
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Every derived event, in delivery order
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Ticks collected for `kind`, in delivery order
    pub fn bucket(&self, kind: EventKind) -> &[Tick] {
        self.buckets.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Final text of the run
    pub fn flush(mut self) -> String {
        if self.mode == AccumulatorMode::Verify {
            for kind in EventKind::ALL {
                let ticks = match self.buckets.get_mut(&kind) {
                    Some(ticks) if !ticks.is_empty() => ticks,
                    _ => continue,
                };
                ticks.sort();
                self.transcript.push_str(kind.header());
                self.transcript.push('\n');
                for tick in ticks.iter() {
                    self.transcript.push_str(&format!("---At Tick #{}\n", tick));
                }
            }
        }
        self.transcript
    }

    fn record(&mut self, ctx: &TickContext, kind: EventKind, node: &NodeSnapshot, modifier: Option<String>) {
        let mut record = EventRecord::new(ctx.tick(), kind, node.name.clone());
        if let Some(modifier) = modifier {
            record = record.with_modifier(modifier);
        }
        tracing::trace!(%record, "event");
        self.records.push(record);
    }

    fn bucketize(&mut self, ctx: &TickContext, kind: EventKind) {
        self.buckets.entry(kind).or_default().push(ctx.tick());
    }

    /// Record an event that has a literal line of its own
    fn emit(&mut self, ctx: &TickContext, kind: EventKind, node: &NodeSnapshot, literal: &str) {
        self.record(ctx, kind, node, None);
        match self.mode {
            AccumulatorMode::Verify => self.bucketize(ctx, kind),
            AccumulatorMode::Legacy => {
                self.transcript.push_str(&format!("  {}: {}\n", node.name, literal));
            }
        }
    }
}

impl ClockObserver for EventAccumulator {
    fn on_state_changed(&mut self, ctx: &TickContext, node: &NodeSnapshot) {
        if !self.channels(node.id).contains(Channels::STATE) {
            return;
        }
        if node.state == ClockState::Active {
            self.emit(ctx, EventKind::Begun, node, "CurrentStateInvalidated fired (Begun)");
        } else {
            self.emit(ctx, EventKind::Ended, node, "CurrentStateInvalidated fired (Ended)");
        }
    }

    fn on_speed_changed(&mut self, ctx: &TickContext, node: &NodeSnapshot) {
        if !self.channels(node.id).contains(Channels::SPEED) {
            return;
        }
        let speed = node.speed.unwrap_or(UNDEFINED_SPEED);
        let sign = sign_of(speed);
        let track = self.tracks.entry(node.id).or_default();

        let mut derived = Vec::new();
        if node.speed.is_some() && sign != 0 {
            let flipped = track.last_sign.map_or(false, |last| last != sign);
            let backward_from_rest = track.last_seen == Some(0) && sign < 0;
            if flipped || backward_from_rest {
                derived.push(EventKind::Reversed);
            }
        }
        if node.paused {
            derived.push(EventKind::Paused);
        } else if track.paused {
            derived.push(EventKind::Resumed);
        }

        if sign != 0 {
            track.last_sign = Some(sign);
        }
        track.last_seen = Some(sign);
        track.paused = node.paused;

        let modifier = Some(format!("speed {}", speed));
        if derived.is_empty() {
            self.record(ctx, EventKind::SpeedInvalidated, node, modifier.clone());
            if self.mode == AccumulatorMode::Verify {
                self.bucketize(ctx, EventKind::SpeedInvalidated);
            }
        }
        for kind in &derived {
            self.record(ctx, *kind, node, modifier.clone());
            if self.mode == AccumulatorMode::Verify {
                self.bucketize(ctx, *kind);
            }
        }

        if self.mode == AccumulatorMode::Legacy {
            let mut line = format!("  {}: CurrentGlobalSpeedInvalidated fired", node.name);
            for kind in &derived {
                line.push_str(match kind {
                    EventKind::Reversed => "  (Reversed)",
                    EventKind::Paused => "  (Paused)",
                    _ => "  (Resumed)",
                });
            }
            line.push('\n');
            self.transcript.push_str(&line);
        }
    }

    fn on_time_changed(&mut self, ctx: &TickContext, node: &NodeSnapshot) {
        let channels = self.channels(node.id);

        if channels.contains(Channels::TIME) {
            let progress = node.progress_text();
            self.transcript.push_str(&format!(
                "  {}: CurrentTimeInvalidated fired (Progress = {})\n",
                node.name, progress
            ));
            self.record(ctx, EventKind::CurrentTimeInvalidated, node, Some(progress));
            if self.mode == AccumulatorMode::Verify {
                self.bucketize(ctx, EventKind::CurrentTimeInvalidated);
            }
        }

        if channels.contains(Channels::REPEAT) {
            let iteration = match node.iteration {
                Some(iteration) => iteration,
                None => return,
            };
            let track = self.tracks.entry(node.id).or_default();
            if iteration > track.max_iteration {
                let repeated = track.max_iteration > 0;
                track.max_iteration = iteration;
                if repeated {
                    self.emit(ctx, EventKind::Repeated, node, "CurrentTimeInvalidated fired  (Repeated)");
                }
            }
        }
    }

    fn on_completed(&mut self, ctx: &TickContext, node: &NodeSnapshot) {
        if self.channels(node.id).contains(Channels::COMPLETED) {
            self.emit(ctx, EventKind::Completed, node, "Completed fired");
        }
    }

    fn on_remove_requested(&mut self, ctx: &TickContext, node: &NodeSnapshot) {
        if self.channels(node.id).contains(Channels::REMOVE_REQUESTED) {
            self.emit(ctx, EventKind::RemoveRequested, node, "RemoveRequested fired");
        }
    }
}

fn engine_channels(channels: Channels) -> Channels {
    if channels.contains(Channels::REPEAT) {
        channels.union(Channels::new(Channels::TIME))
    } else {
        channels
    }
}

fn sign_of(speed: f64) -> i8 {
    if speed > 0.0 {
        1
    } else if speed < 0.0 {
        -1
    } else {
        0
    }
}
