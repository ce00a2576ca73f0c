//! Error taxonomy for the bootstrap itself.
//!
//! Failures raised by collaborators (the lifecycle engine, error handlers,
//! the completion handler) travel as [`anyhow::Error`] so their cause chains
//! and backtraces survive intact. `BootError` covers what the bootstrap can
//! get wrong on its own.

use std::time::Duration;

use crate::bootstrap::Phase;

/// Bootstrap errors.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("invalid reporting DSN {dsn:?}: {reason}")]
    InvalidDsn { dsn: String, reason: String },

    #[error("error reporter did not initialise within {}ms", .0.as_millis())]
    ReporterTimeout(Duration),

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    #[error("illegal transition from {phase} on {event}")]
    IllegalTransition { phase: Phase, event: &'static str },
}

/// Result type for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootError>;
