//! Tick scheduler - drives discrete simulated time into the engine
//!
//! For every tick between `begin` and `end` the scheduler:
//! - writes the `Processing time <t> ms` marker
//! - runs the case's pre-tick hook
//! - asks the engine to advance, with the accumulator as observer
//! - samples the node tree (progress lines or a full state dump)
//! - runs the case's post-tick hook
//!
//! A schedule whose step differs from the step of a clock inside the engine
//! is rejected before the first tick.

use std::time::Duration;

use tempora_core::{ClockState, ClockTree, NodeId, OracleError, OracleResult, Tick, TickContext, TickSource};

use crate::accumulator::EventAccumulator;

/// What the scheduler writes after each engine tick
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SampleMode {
    /// `"  <name>: Progress = <p>"` for every active node
    #[default]
    Execute,
    /// `"State of <name> : ..."` for every node
    DisplayState,
}

/// Tick range and sampling for one run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub begin: Tick,
    /// Last tick, inclusive
    pub end: Tick,
    /// Milliseconds between ticks
    pub step: u64,
    pub mode: SampleMode,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            begin: Tick::ZERO,
            end: Tick::from_millis(1000),
            step: 10,
            mode: SampleMode::Execute,
        }
    }
}

impl ScheduleConfig {
    pub fn new(begin_ms: u64, end_ms: u64, step_ms: u64) -> Self {
        ScheduleConfig {
            begin: Tick::from_millis(begin_ms),
            end: Tick::from_millis(end_ms),
            step: step_ms,
            mode: SampleMode::Execute,
        }
    }

    pub fn with_mode(mut self, mode: SampleMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validate(&self) -> OracleResult<()> {
        if self.step == 0 {
            return Err(OracleError::config("tick step must be positive"));
        }
        if self.end < self.begin {
            return Err(OracleError::config(format!(
                "end tick {} precedes begin tick {}",
                self.end, self.begin
            )));
        }
        Ok(())
    }

    /// Ticks this schedule visits, in order
    pub fn ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        std::iter::successors(Some(self.begin), move |t| t.checked_add(self.step))
            .take_while(move |t| *t <= self.end)
    }
}

/// Per-tick callbacks a case uses to act on the engine
pub trait TickHooks<E: ?Sized> {
    fn pre_tick(&mut self, _tick: Tick, _engine: &mut E) -> OracleResult<()> {
        Ok(())
    }

    fn post_tick(&mut self, _tick: Tick, _engine: &mut E) -> OracleResult<()> {
        Ok(())
    }
}

/// Hooks that do nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl<E: ?Sized> TickHooks<E> for NoHooks {}

/// Drives a tick source through a schedule
#[derive(Clone, Debug)]
pub struct Scheduler {
    config: ScheduleConfig,
}

impl Scheduler {
    pub fn new(config: ScheduleConfig) -> OracleResult<Self> {
        config.validate()?;
        Ok(Scheduler { config })
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Run the whole schedule against `engine`, rooted at `root`
    pub fn run<E, H>(
        &self,
        root: NodeId,
        engine: &mut E,
        hooks: &mut H,
        accumulator: &mut EventAccumulator,
    ) -> OracleResult<()>
    where
        E: TickSource + ClockTree + ?Sized,
        H: TickHooks<E> + ?Sized,
    {
        if engine.snapshot(root).is_none() {
            return Err(OracleError::config(format!(
                "root node {} is not bound to the tick source",
                root
            )));
        }

        engine.check_step(Duration::from_millis(self.config.step))?;

        engine.set_current_time(self.config.begin.as_duration());
        engine.start();

        for tick in self.config.ticks() {
            let ctx = TickContext::new(tick);
            engine.set_current_time(tick.as_duration());

            accumulator.mark_tick(tick);
            tracing::debug!(tick = tick.as_millis(), "Processing time {} ms", tick);

            hooks.pre_tick(tick, engine)?;

            engine.set_current_time(tick.as_duration());
            engine.tick(&ctx, &mut *accumulator)?;

            match self.config.mode {
                SampleMode::Execute => sample_progress(engine, root, accumulator),
                SampleMode::DisplayState => render_state(engine, root, accumulator),
            }

            hooks.post_tick(tick, engine)?;
        }
        Ok(())
    }
}

fn sample_progress<E: ClockTree + ?Sized>(engine: &E, id: NodeId, accumulator: &mut EventAccumulator) {
    let snapshot = match engine.snapshot(id) {
        Some(snapshot) => snapshot,
        None => return,
    };
    if snapshot.state == ClockState::Active {
        accumulator.sample_progress(&snapshot);
    }
    for child in engine.children(id) {
        let running = engine
            .snapshot(child)
            .map(|c| c.state.is_running())
            .unwrap_or(false);
        if running {
            sample_progress(engine, child, accumulator);
        }
    }
}

fn render_state<E: ClockTree + ?Sized>(engine: &E, id: NodeId, accumulator: &mut EventAccumulator) {
    if let Some(snapshot) = engine.snapshot(id) {
        accumulator.render_state(&snapshot);
    }
    for child in engine.children(id) {
        render_state(engine, child, accumulator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::AccumulatorMode;
    use tempora_core::Channels;
    use tempora_sim::{SimEngine, Timeline};

    #[test]
    fn test_invalid_schedules_rejected() {
        assert!(matches!(
            Scheduler::new(ScheduleConfig::new(0, 100, 0)),
            Err(OracleError::Configuration(_))
        ));
        assert!(Scheduler::new(ScheduleConfig::new(100, 0, 10)).is_err());
        assert!(Scheduler::new(ScheduleConfig::new(50, 50, 10)).is_ok());
    }

    #[test]
    fn test_tick_range_is_inclusive() {
        let ticks: Vec<u64> = ScheduleConfig::new(0, 30, 10).ticks().map(Tick::as_millis).collect();
        assert_eq!(ticks, vec![0, 10, 20, 30]);

        let ticks: Vec<u64> = ScheduleConfig::new(5, 30, 10).ticks().map(Tick::as_millis).collect();
        assert_eq!(ticks, vec![5, 15, 25]);
    }

    #[test]
    fn test_unknown_root_rejected_before_any_tick() {
        let mut engine = SimEngine::new(Timeline::leaf("Leaf", 100)).unwrap();
        let mut acc = EventAccumulator::new(AccumulatorMode::Legacy);
        let scheduler = Scheduler::new(ScheduleConfig::new(0, 50, 10)).unwrap();

        let result = scheduler.run(NodeId::new(9), &mut engine, &mut NoHooks, &mut acc);
        assert!(matches!(result, Err(OracleError::Configuration(_))));
        assert!(acc.transcript().is_empty());
    }

    #[test]
    fn test_clock_step_mismatch_rejected_before_any_tick() {
        use tempora_clock::{SharedClock, SlipClockConfig};

        let shared = SharedClock::from_config(SlipClockConfig::stalled(100.0, 50.0, 300).unwrap()).unwrap();
        let mut engine = SimEngine::new(Timeline::new("Synced").with_clock(shared.boxed())).unwrap();
        let mut acc = EventAccumulator::new(AccumulatorMode::Legacy);
        let scheduler = Scheduler::new(ScheduleConfig::new(0, 100, 20)).unwrap();

        let result = scheduler.run(NodeId::ROOT, &mut engine, &mut NoHooks, &mut acc);
        assert!(matches!(result, Err(OracleError::Configuration(_))));
        assert!(acc.transcript().is_empty());
        assert_eq!(shared.reported(), Duration::ZERO);
    }

    #[test]
    fn test_execute_writes_markers_and_progress() {
        let mut engine = SimEngine::new(Timeline::leaf("Leaf", 20)).unwrap();
        let mut acc = EventAccumulator::new(AccumulatorMode::Legacy);
        let scheduler = Scheduler::new(ScheduleConfig::new(0, 30, 10)).unwrap();

        scheduler.run(NodeId::ROOT, &mut engine, &mut NoHooks, &mut acc).unwrap();

        assert_eq!(
            acc.flush(),
            "Processing time 0 ms\n  Leaf: Progress = 0\n\
             Processing time 10 ms\n  Leaf: Progress = 0.5\n\
             Processing time 20 ms\n\
             Processing time 30 ms\n"
        );
    }

    #[test]
    fn test_display_state_renders_every_node() {
        let tree = Timeline::new("Group").with_child(Timeline::leaf("Child", 10).with_begin_ms(20));
        let mut engine = SimEngine::new(tree).unwrap();
        let mut acc = EventAccumulator::new(AccumulatorMode::Legacy);
        let scheduler = Scheduler::new(ScheduleConfig::new(0, 0, 10).with_mode(SampleMode::DisplayState)).unwrap();

        scheduler.run(NodeId::ROOT, &mut engine, &mut NoHooks, &mut acc).unwrap();

        assert_eq!(
            acc.flush(),
            "Processing time 0 ms\n\
             State of Group :  , Progress : 0 , CurrentState : Active\n\
             State of Child :  , Progress :  , CurrentState : Stopped\n"
        );
    }

    struct PauseAt(u64);

    impl TickHooks<SimEngine> for PauseAt {
        fn pre_tick(&mut self, tick: Tick, engine: &mut SimEngine) -> OracleResult<()> {
            if tick.as_millis() == self.0 {
                engine.pause(NodeId::ROOT)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_hooks_act_before_engine_tick() {
        let mut engine = SimEngine::new(Timeline::leaf("Leaf", 100)).unwrap();
        let mut acc = EventAccumulator::new(AccumulatorMode::Verify);
        acc.attach(&mut engine, NodeId::ROOT, Channels::new(Channels::SPEED)).unwrap();
        let scheduler = Scheduler::new(ScheduleConfig::new(0, 50, 10)).unwrap();

        scheduler.run(NodeId::ROOT, &mut engine, &mut PauseAt(20), &mut acc).unwrap();

        let paused: Vec<u64> = acc.bucket(tempora_core::EventKind::Paused).iter().map(|t| t.as_millis()).collect();
        assert_eq!(paused, vec![20]);
    }
}
