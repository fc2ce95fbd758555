//! Nodes synchronized to the slip clock

use std::time::Duration;

use tempora_clock::{SharedClock, SlipClockConfig};
use tempora_core::{Channels, OracleResult, SeekOrigin};
use tempora_sim::Timeline;

use super::script::{Scenario, Step};
use crate::accumulator::AccumulatorMode;
use crate::registry::TimingCase;
use crate::scheduler::ScheduleConfig;

/// Clock stalls between 100 ms and 150 ms; duration forced to 300 ms
#[derive(Debug, Default)]
pub struct SlipClockCase;

impl TimingCase for SlipClockCase {
    fn test(&mut self) -> OracleResult<String> {
        let clock = SharedClock::from_config(SlipClockConfig::stalled(100.0, 50.0, 300)?)?;
        let node = Timeline::new("SlipNode").with_clock(clock.boxed());

        let mut acc = Scenario::new(node, ScheduleConfig::new(0, 400, 10))
            .attach("SlipNode", Channels::STATE | Channels::TIME | Channels::COMPLETED)
            .run()?;
        acc.note(format!("Reported time: {} ms", clock.reported().as_millis()));
        Ok(acc.flush())
    }
}

#[derive(Debug, Default)]
pub struct SeekSlipCase;

impl TimingCase for SeekSlipCase {
    fn test(&mut self) -> OracleResult<String> {
        let clock = SharedClock::from_config(SlipClockConfig::stalled(100.0, 50.0, 400)?)?;
        let node = Timeline::new("SlipNode").with_clock(clock.boxed());

        let mut acc = Scenario::new(node, ScheduleConfig::new(0, 280, 10))
            .mode(AccumulatorMode::Verify)
            .attach("SlipNode", Channels::STATE | Channels::SPEED)
            .at(
                60,
                Step::Seek("SlipNode".into(), Duration::from_millis(200), SeekOrigin::BeginTime),
            )
            .at(120, Step::Pause("SlipNode".into()))
            .at(160, Step::Resume("SlipNode".into()))
            .run()?;
        acc.note(format!("Reported time: {} ms", clock.reported().as_millis()));
        Ok(acc.flush())
    }
}
