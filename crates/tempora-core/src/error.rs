//! Error types for the TEMPORA oracle
//!
//! Every variant here is fatal for the run that raised it. Line-level
//! comparison mismatches are not errors; they are collected by the comparator.

use std::path::PathBuf;

use thiserror::Error;

/// Core oracle errors
#[derive(Error, Debug)]
pub enum OracleError {
    /// Invalid or missing engine/adapter/scheduler setup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Named case could not be resolved, constructed or invoked
    #[error("Error in test case {case}: {reason}")]
    EngineInvocation { case: String, reason: String },

    /// Fixture could not be read (verify) or written (create)
    #[error("Fixture I/O failed for {path:?}: {source}")]
    FixtureIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OracleError {
    pub fn config(msg: impl Into<String>) -> Self {
        OracleError::Configuration(msg.into())
    }

    pub fn invocation(case: impl Into<String>, reason: impl Into<String>) -> Self {
        OracleError::EngineInvocation {
            case: case.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for oracle operations
pub type OracleResult<T> = Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = OracleError::invocation("SBPause1", "Cannot find class");
        assert_eq!(err.to_string(), "Error in test case SBPause1: Cannot find class");

        let err = OracleError::config("step must be positive");
        assert!(err.to_string().contains("step must be positive"));
    }
}
