//! TEMPORA Sim - Reference clock-tree engine
//!
//! A small deterministic engine that satisfies the collaborator surface the
//! oracle drives:
//! - Timeline declarations (begin, duration, repeat, auto-reverse, fill)
//! - Interactive control (begin, pause, resume, seek, stop, remove)
//! - Externally clocked nodes
//! - Snapshot-diff notifications filtered by subscription

pub mod engine;
pub mod timeline;

pub use engine::*;
pub use timeline::*;
