use thiserror::Error;

use crate::status::QueueStatus;

/// Errors raised by the queue item state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("illegal status transition for item {item_id}: {from} -> {to}")]
    IllegalTransition {
        item_id: String,
        from: QueueStatus,
        to: QueueStatus,
    },

    #[error("item {item_id} exhausted its retries (attempt {attempt} > max {max_retries})")]
    RetriesExhausted {
        item_id: String,
        attempt: u32,
        max_retries: u32,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
