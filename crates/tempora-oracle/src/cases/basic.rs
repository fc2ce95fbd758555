use tempora_core::{Channels, OracleResult};
use tempora_sim::Timeline;

use super::script::Scenario;
use crate::registry::TimingCase;
use crate::scheduler::{SampleMode, ScheduleConfig};

/// One 100 ms node from begin to fill, written literally
#[derive(Debug, Default)]
pub struct BeginCase;

impl TimingCase for BeginCase {
    fn test(&mut self) -> OracleResult<String> {
        let acc = Scenario::new(Timeline::leaf("TimeNode", 100), ScheduleConfig::new(0, 120, 10))
            .attach("TimeNode", Channels::STATE | Channels::TIME | Channels::COMPLETED)
            .run()?;
        Ok(acc.flush())
    }
}

/// Parent with a child starting immediately and one starting halfway
#[derive(Debug, Default)]
pub struct GroupStateCase;

impl TimingCase for GroupStateCase {
    fn test(&mut self) -> OracleResult<String> {
        let group = Timeline::new("Group")
            .with_child(Timeline::leaf("A", 100))
            .with_child(Timeline::leaf("B", 50).with_begin_ms(50));
        let schedule = ScheduleConfig::new(0, 120, 20).with_mode(SampleMode::DisplayState);

        let acc = Scenario::new(group, schedule)
            .attach("Group", Channels::STATE)
            .attach("A", Channels::STATE)
            .attach("B", Channels::STATE)
            .run()?;
        Ok(acc.flush())
    }
}
