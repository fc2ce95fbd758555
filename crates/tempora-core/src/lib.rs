//! TEMPORA Core - Fundamental types for the timing oracle
//!
//! This crate defines the types shared by every TEMPORA crate:
//! - Simulated time (Tick, TickContext, DeclaredDuration)
//! - Clock node identity and snapshots
//! - The canonical event vocabulary
//! - The engine collaborator traits (TickSource, ClockTree, ClockObserver, ExternalClock)
//! - The error taxonomy

pub mod time;
pub mod node;
pub mod event;
pub mod engine;
pub mod error;

pub use time::*;
pub use node::*;
pub use event::*;
pub use engine::*;
pub use error::*;
