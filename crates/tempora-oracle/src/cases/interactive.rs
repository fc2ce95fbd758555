use tempora_core::{Channels, OracleResult};
use tempora_sim::Timeline;

use super::script::{Scenario, Step};
use crate::accumulator::AccumulatorMode;
use crate::registry::TimingCase;
use crate::scheduler::ScheduleConfig;

#[derive(Debug, Default)]
pub struct PauseResumeCase;

impl TimingCase for PauseResumeCase {
    fn test(&mut self) -> OracleResult<String> {
        let acc = Scenario::new(Timeline::leaf("TimeNode", 200), ScheduleConfig::new(0, 150, 10))
            .mode(AccumulatorMode::Verify)
            .attach("TimeNode", Channels::STATE | Channels::SPEED)
            .at(40, Step::Pause("TimeNode".into()))
            .at(80, Step::Resume("TimeNode".into()))
            .run()?;
        Ok(acc.flush())
    }
}

/// Node removed while active: it ends without completing
#[derive(Debug, Default)]
pub struct RemoveRequestedCase;

impl TimingCase for RemoveRequestedCase {
    fn test(&mut self) -> OracleResult<String> {
        let acc = Scenario::new(Timeline::leaf("TimeNode", 200), ScheduleConfig::new(0, 120, 10))
            .mode(AccumulatorMode::Verify)
            .attach(
                "TimeNode",
                Channels::STATE | Channels::COMPLETED | Channels::REMOVE_REQUESTED,
            )
            .at(70, Step::Remove("TimeNode".into()))
            .run()?;
        Ok(acc.flush())
    }
}
