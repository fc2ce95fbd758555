//! Slip-capable synchronized clock
//!
//! The engine queries this clock for the current time of a synchronized
//! node. Inside the slip window the reported time stays put while the
//! observed counter keeps running, which is how a stalled media source
//! looks to the engine.

use std::time::Duration;

use tempora_core::{DeclaredDuration, ExternalClock, OracleError, OracleResult, Tick, TickContext};

use crate::SlipWindow;

/// Adapter configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlipClockConfig {
    /// Stall interval relative to the begin time
    pub window: SlipWindow,
    /// Amount the reported and observed times advance per query
    pub step: Duration,
    /// Duration declared on the synchronized node
    pub declared: DeclaredDuration,
    /// Natural duration of the underlying source
    pub natural: DeclaredDuration,
    /// Hard duration override; also caps the reported time
    pub override_duration: Option<Duration>,
    /// Begin time of the synchronized node, if it has one
    pub begin_time: Option<Duration>,
}

impl Default for SlipClockConfig {
    fn default() -> Self {
        SlipClockConfig {
            window: SlipWindow::NONE,
            step: Duration::from_millis(10),
            declared: DeclaredDuration::Automatic,
            natural: DeclaredDuration::Automatic,
            override_duration: None,
            begin_time: None,
        }
    }
}

impl SlipClockConfig {
    /// Source that stalls between `start_ms` and `start_ms + duration_ms`
    /// after its begin time, with a fixed `override_ms` duration
    pub fn stalled(start_ms: f64, duration_ms: f64, override_ms: u64) -> OracleResult<Self> {
        Ok(SlipClockConfig {
            window: SlipWindow::from_millis(start_ms, duration_ms)?,
            override_duration: Some(Duration::from_millis(override_ms)),
            begin_time: Some(Duration::ZERO),
            ..Default::default()
        })
    }

    pub fn with_window(mut self, window: SlipWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    pub fn with_declared(mut self, declared: DeclaredDuration) -> Self {
        self.declared = declared;
        self
    }

    pub fn with_natural(mut self, natural: DeclaredDuration) -> Self {
        self.natural = natural;
        self
    }

    pub fn with_override(mut self, duration: Duration) -> Self {
        self.override_duration = Some(duration);
        self
    }

    pub fn with_begin_time(mut self, begin: Duration) -> Self {
        self.begin_time = Some(begin);
        self
    }

    /// Check the configuration before a clock is built from it
    pub fn validate(&self) -> OracleResult<()> {
        if self.step.is_zero() {
            return Err(OracleError::config("slip clock step must be positive"));
        }
        Ok(())
    }
}

/// Phase of the adapter, derived on every query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlipPhase {
    Normal,
    InSlip,
}

/// Slip-capable external clock
#[derive(Debug)]
pub struct SlipClock {
    config: SlipClockConfig,
    /// Time handed to the engine
    reported: Duration,
    /// Time the source would show without stalls
    observed: Duration,
    paused: bool,
    last_tick: Option<Tick>,
    last_value: Duration,
}

impl SlipClock {
    pub fn new(config: SlipClockConfig) -> OracleResult<Self> {
        config.validate()?;
        Ok(SlipClock {
            config,
            reported: Duration::ZERO,
            observed: Duration::ZERO,
            paused: false,
            last_tick: None,
            last_value: Duration::ZERO,
        })
    }

    pub fn config(&self) -> &SlipClockConfig {
        &self.config
    }

    pub fn reported(&self) -> Duration {
        self.reported
    }

    pub fn observed(&self) -> Duration {
        self.observed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Resolved duration: override, else declared, else natural, else forever
    pub fn test_duration(&self) -> DeclaredDuration {
        match self.config.override_duration {
            Some(d) => DeclaredDuration::Finite(d),
            None => self.config.declared.resolve(self.config.natural),
        }
    }

    pub fn phase(&self) -> SlipPhase {
        let stalled = match self.config.begin_time {
            Some(begin) => self.config.window.contains(begin, self.observed),
            None => false,
        };
        if stalled || self.paused {
            SlipPhase::InSlip
        } else {
            SlipPhase::Normal
        }
    }

    /// Answer a time query for the tick in `ctx`
    pub fn query(&mut self, ctx: &TickContext) -> Duration {
        if self.last_tick == Some(ctx.tick()) {
            return self.last_value;
        }

        let begin = match self.config.begin_time {
            Some(begin) => begin,
            None => return Duration::ZERO,
        };
        if self.config.declared.is_automatic() && self.config.override_duration.is_none() {
            return Duration::ZERO;
        }

        let phase = self.phase();
        if phase == SlipPhase::Normal {
            self.reported = self.reported.saturating_add(self.config.step);
            if let Some(cap) = self.config.override_duration {
                self.reported = self.reported.min(cap);
            }
        }
        self.observed = self.observed.saturating_add(self.config.step);

        tracing::trace!(
            tick = ctx.tick().as_millis(),
            begin_ms = begin.as_millis() as u64,
            observed_ms = self.observed.as_millis() as u64,
            reported_ms = self.reported.as_millis() as u64,
            ?phase,
            "slip clock query"
        );

        self.last_tick = Some(ctx.tick());
        self.last_value = self.reported;
        self.reported
    }

    fn resync(&mut self, requested: Option<Duration>, speed: Option<f64>) {
        self.reported = requested.unwrap_or(Duration::ZERO);
        self.paused = speed.map_or(true, |s| s == 0.0);
        tracing::trace!(
            reported_ms = self.reported.as_millis() as u64,
            paused = self.paused,
            "slip clock resynchronized"
        );
    }
}

impl ExternalClock for SlipClock {
    fn current_time(&mut self, ctx: &TickContext) -> Duration {
        self.query(ctx)
    }

    fn duration(&self) -> DeclaredDuration {
        self.test_duration()
    }

    fn step(&self) -> Option<Duration> {
        Some(self.config.step)
    }

    fn set_begin_time(&mut self, begin: Option<Duration>) {
        self.config.begin_time = begin;
    }

    fn on_stopped(&mut self) {
        self.reported = Duration::ZERO;
    }

    fn on_speed_changed(&mut self, requested: Option<Duration>, speed: Option<f64>) {
        self.resync(requested, speed);
    }

    fn on_discontinuous_jump(&mut self, requested: Option<Duration>, speed: Option<f64>) {
        self.resync(requested, speed);
    }
}
