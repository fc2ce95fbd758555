//! TEMPORA Oracle - Deterministic timing oracle
//!
//! This crate provides:
//! - The tick scheduler that drives an engine over a fixed schedule
//! - The event accumulator (legacy and verify transcripts)
//! - The locale- and tolerance-aware transcript comparator
//! - The expected-output fixture store
//! - The case registry, the bundled cases and the case runner

pub mod scheduler;
pub mod accumulator;
pub mod comparator;
pub mod fixture;
pub mod registry;
pub mod runner;
pub mod cases;

pub use scheduler::*;
pub use accumulator::*;
pub use comparator::*;
pub use fixture::*;
pub use registry::*;
pub use runner::*;
