use tempora_core::{Channels, OracleResult};
use tempora_sim::{RepeatBehavior, Timeline};

use super::script::Scenario;
use crate::accumulator::AccumulatorMode;
use crate::registry::TimingCase;
use crate::scheduler::ScheduleConfig;

/// 50 ms forward then 50 ms back
#[derive(Debug, Default)]
pub struct AutoReverseCase;

impl TimingCase for AutoReverseCase {
    fn test(&mut self) -> OracleResult<String> {
        let acc = Scenario::new(
            Timeline::leaf("TimeNode", 50).with_auto_reverse(),
            ScheduleConfig::new(0, 120, 10),
        )
        .mode(AccumulatorMode::Verify)
        .attach("TimeNode", Channels::STATE | Channels::SPEED | Channels::COMPLETED)
        .run()?;
        Ok(acc.flush())
    }
}

#[derive(Debug, Default)]
pub struct RepeatCase;

impl TimingCase for RepeatCase {
    fn test(&mut self) -> OracleResult<String> {
        let acc = Scenario::new(
            Timeline::leaf("TimeNode", 50).with_repeat(RepeatBehavior::Count(3)),
            ScheduleConfig::new(0, 160, 10),
        )
        .mode(AccumulatorMode::Verify)
        .attach("TimeNode", Channels::STATE | Channels::COMPLETED | Channels::REPEAT)
        .run()?;
        Ok(acc.flush())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_reverse_buckets() {
        let text = AutoReverseCase.test().unwrap();

        assert!(text.ends_with(
            "---------- CurrentStateInvalidated: Timeline Began\n\
             ---At Tick #0\n\
             ---------- CurrentStateInvalidated: Timeline Ended\n\
             ---At Tick #100\n\
             ---------- CurrentGlobalSpeedInvalidated\n\
             ---At Tick #0\n\
             ---At Tick #100\n\
             ---------- CurrentGlobalSpeedInvalidated: Timeline Reversed\n\
             ---At Tick #50\n\
             ---------- Completed\n\
             ---At Tick #100\n"
        ));
        assert!(text.contains("Processing time 70 ms\n  TimeNode: Progress = 0.6\n"));
    }

    #[test]
    fn test_repeat_buckets() {
        let text = RepeatCase.test().unwrap();

        assert!(text.ends_with(
            "---------- CurrentStateInvalidated: Timeline Began\n\
             ---At Tick #0\n\
             ---------- CurrentStateInvalidated: Timeline Ended\n\
             ---At Tick #150\n\
             ---------- CurrentTimeInvalidated: Timeline Repeated\n\
             ---At Tick #50\n\
             ---At Tick #100\n\
             ---------- Completed\n\
             ---At Tick #150\n"
        ));
        assert!(!text.contains("CurrentTimeInvalidated fired"));
    }
}
