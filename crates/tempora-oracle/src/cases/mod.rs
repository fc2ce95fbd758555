//! Bundled timing cases
//!
//! Every case drives the reference engine through a fixed schedule and
//! returns the transcript the accumulator produced.

pub mod script;

mod basic;
mod interactive;
mod iteration;
mod sync;

pub use basic::{BeginCase, GroupStateCase};
pub use interactive::{PauseResumeCase, RemoveRequestedCase};
pub use iteration::{AutoReverseCase, RepeatCase};
pub use sync::{SeekSlipCase, SlipClockCase};

use crate::registry::{CaseEntry, TimingCase};

fn boxed<C: TimingCase + Default + 'static>() -> Box<dyn TimingCase> {
    Box::new(C::default())
}

/// Cases known to `CaseRegistry::builtin`
pub const BUILTIN_CASES: &[CaseEntry] = &[
    CaseEntry {
        id: "Begin",
        description: "single 100 ms node, literal transcript",
        constructor: boxed::<BeginCase>,
    },
    CaseEntry {
        id: "PauseResume",
        description: "pause at 40 ms, resume at 80 ms",
        constructor: boxed::<PauseResumeCase>,
    },
    CaseEntry {
        id: "AutoReverse",
        description: "auto-reversing node reports its reversal",
        constructor: boxed::<AutoReverseCase>,
    },
    CaseEntry {
        id: "Repeat",
        description: "three iterations with the repeat companion",
        constructor: boxed::<RepeatCase>,
    },
    CaseEntry {
        id: "GroupState",
        description: "parent with two children, state dump per tick",
        constructor: boxed::<GroupStateCase>,
    },
    CaseEntry {
        id: "SlipClock",
        description: "node synchronized to a stalling clock",
        constructor: boxed::<SlipClockCase>,
    },
    CaseEntry {
        id: "SeekSlip",
        description: "seek and pause a node synchronized to a stalling clock",
        constructor: boxed::<SeekSlipCase>,
    },
    CaseEntry {
        id: "RemoveRequested",
        description: "node removed while active",
        constructor: boxed::<RemoveRequestedCase>,
    },
];
