//! Scripted scenarios against the reference engine
//!
//! A `Scenario` bundles a timeline, a schedule, the accumulator setup and a
//! `Script` of interactive steps keyed by tick. Steps name nodes; names are
//! resolved against the engine when they run.

use std::collections::BTreeMap;
use std::time::Duration;

use tempora_core::{Channels, NodeId, OracleError, OracleResult, SeekOrigin, Tick};
use tempora_sim::{SimEngine, Timeline};

use crate::accumulator::{AccumulatorMode, EventAccumulator};
use crate::scheduler::{ScheduleConfig, Scheduler, TickHooks};

/// One interactive step
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Begin(String),
    Pause(String),
    Resume(String),
    Seek(String, Duration, SeekOrigin),
    Stop(String),
    Remove(String),
    SpeedRatio(String, f64),
}

impl Step {
    fn target(&self) -> &str {
        match self {
            Step::Begin(name)
            | Step::Pause(name)
            | Step::Resume(name)
            | Step::Seek(name, ..)
            | Step::Stop(name)
            | Step::Remove(name)
            | Step::SpeedRatio(name, _) => name,
        }
    }

    fn apply(&self, engine: &mut SimEngine) -> OracleResult<()> {
        let name = self.target();
        let id = engine
            .find(name)
            .ok_or_else(|| OracleError::config(format!("script names unknown node {}", name)))?;
        match self {
            Step::Begin(_) => engine.begin(id),
            Step::Pause(_) => engine.pause(id),
            Step::Resume(_) => engine.resume(id),
            Step::Seek(_, offset, origin) => engine.seek(id, *offset, *origin),
            Step::Stop(_) => engine.stop(id),
            Step::Remove(_) => engine.remove(id),
            Step::SpeedRatio(_, ratio) => engine.set_speed_ratio(id, *ratio),
        }
    }
}

/// Steps run before the engine tick they are keyed on
#[derive(Clone, Debug, Default)]
pub struct Script {
    steps: BTreeMap<Tick, Vec<Step>>,
}

impl Script {
    pub fn at(&mut self, tick_ms: u64, step: Step) {
        self.steps.entry(Tick::from_millis(tick_ms)).or_default().push(step);
    }
}

impl TickHooks<SimEngine> for Script {
    fn pre_tick(&mut self, tick: Tick, engine: &mut SimEngine) -> OracleResult<()> {
        if let Some(steps) = self.steps.get(&tick) {
            for step in steps {
                tracing::debug!(tick = tick.as_millis(), ?step, "script step");
                step.apply(engine)?;
            }
        }
        Ok(())
    }
}

/// Everything needed to run a case body
pub struct Scenario {
    timeline: Timeline,
    schedule: ScheduleConfig,
    mode: AccumulatorMode,
    attachments: Vec<(String, Channels)>,
    notes: Vec<String>,
    script: Script,
}

impl Scenario {
    pub fn new(timeline: Timeline, schedule: ScheduleConfig) -> Self {
        Scenario {
            timeline,
            schedule,
            mode: AccumulatorMode::Legacy,
            attachments: Vec::new(),
            notes: Vec::new(),
            script: Script::default(),
        }
    }

    pub fn mode(mut self, mode: AccumulatorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn attach(mut self, node: &str, channels: u8) -> Self {
        self.attachments.push((node.to_string(), Channels::new(channels)));
        self
    }

    /// Line written before the first tick
    pub fn note(mut self, line: impl Into<String>) -> Self {
        self.notes.push(line.into());
        self
    }

    pub fn at(mut self, tick_ms: u64, step: Step) -> Self {
        self.script.at(tick_ms, step);
        self
    }

    /// Run the schedule; the accumulator comes back detached and ready to flush
    pub fn run(mut self) -> OracleResult<EventAccumulator> {
        let mut engine = SimEngine::new(self.timeline)?;
        let mut accumulator = EventAccumulator::new(self.mode);

        for (name, channels) in &self.attachments {
            let id = engine
                .find(name)
                .ok_or_else(|| OracleError::config(format!("cannot attach to unknown node {}", name)))?;
            accumulator.attach(&mut engine, id, *channels)?;
        }
        for line in &self.notes {
            accumulator.note(line);
        }

        let scheduler = Scheduler::new(self.schedule)?;
        scheduler.run(NodeId::ROOT, &mut engine, &mut self.script, &mut accumulator)?;
        accumulator.detach_all(&mut engine);

        tracing::debug!(stats = ?engine.stats(), "scenario finished");
        Ok(accumulator)
    }
}
