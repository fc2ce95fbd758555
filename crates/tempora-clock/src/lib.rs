//! TEMPORA Clock - Slip-capable external clock adapter
//!
//! This crate implements the time source a synchronized node consults:
//! - Slip windows during which reported time is withheld
//! - Duration resolution (override, declared, natural)
//! - Pause, resume and discontinuous-jump resynchronization
//! - A shareable handle for inspecting the adapter mid-run

pub mod shared;
pub mod slip;
pub mod window;

pub use shared::*;
pub use slip::*;
pub use window::*;
