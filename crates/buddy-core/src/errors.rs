use std::time::Duration;

use crate::quiz::QuizError;

/// Core error type for the bot.
///
/// Adapter crates should map their specific errors into this type so the core
/// can tell retryable platform failures (conflict vs transient) apart from
/// failures that are reported back to a user.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),

    /// Another consumer is long-polling the same update stream.
    #[error("update conflict: {0}")]
    Conflict(String),

    #[error("{what} timed out after {}s", .after.as_secs())]
    Timeout { what: String, after: Duration },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Quiz(#[from] QuizError),
}

impl Error {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
