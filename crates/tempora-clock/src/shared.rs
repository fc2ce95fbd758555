//! Shareable adapter handle
//!
//! The engine owns its external clock as a boxed trait object, yet a test
//! case usually wants to look at the adapter while the run is going. The
//! handle keeps one adapter behind a mutex and implements `ExternalClock`
//! itself, so a clone can be given to the engine.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tempora_core::{DeclaredDuration, ExternalClock, OracleResult, TickContext};

use crate::{SlipClock, SlipClockConfig, SlipPhase};

/// Cloneable handle to one `SlipClock`
#[derive(Clone, Debug)]
pub struct SharedClock {
    inner: Arc<Mutex<SlipClock>>,
}

impl SharedClock {
    pub fn new(clock: SlipClock) -> Self {
        SharedClock {
            inner: Arc::new(Mutex::new(clock)),
        }
    }

    pub fn from_config(config: SlipClockConfig) -> OracleResult<Self> {
        Ok(Self::new(SlipClock::new(config)?))
    }

    /// Lock the adapter for inspection
    pub fn lock(&self) -> MutexGuard<'_, SlipClock> {
        self.inner.lock()
    }

    pub fn reported(&self) -> Duration {
        self.inner.lock().reported()
    }

    pub fn phase(&self) -> SlipPhase {
        self.inner.lock().phase()
    }

    /// Boxed clone ready to hand to an engine
    pub fn boxed(&self) -> Box<dyn ExternalClock> {
        Box::new(self.clone())
    }
}

impl ExternalClock for SharedClock {
    fn current_time(&mut self, ctx: &TickContext) -> Duration {
        self.inner.lock().current_time(ctx)
    }

    fn duration(&self) -> DeclaredDuration {
        self.inner.lock().duration()
    }

    fn step(&self) -> Option<Duration> {
        self.inner.lock().step()
    }

    fn set_begin_time(&mut self, begin: Option<Duration>) {
        self.inner.lock().set_begin_time(begin);
    }

    fn on_stopped(&mut self) {
        self.inner.lock().on_stopped();
    }

    fn on_speed_changed(&mut self, requested: Option<Duration>, speed: Option<f64>) {
        self.inner.lock().on_speed_changed(requested, speed);
    }

    fn on_discontinuous_jump(&mut self, requested: Option<Duration>, speed: Option<f64>) {
        self.inner.lock().on_discontinuous_jump(requested, speed);
    }
}
