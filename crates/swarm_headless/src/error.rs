//! Error types for the headless driver.

use std::path::PathBuf;

use swarm_core::error::AgentError;
use thiserror::Error;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Errors surfaced by the driver.
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// Reading stdin or writing stdout failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A protocol line was not valid JSON for its message type.
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// The agent config file failed to parse.
    #[error("Failed to parse config {path}: {source}")]
    Ron {
        /// Offending file.
        path: PathBuf,
        /// Parser error with line and column.
        #[source]
        source: ron::error::SpannedError,
    },

    /// The agent rejected its configuration or hit a hard failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// A `--option` argument was not of the form `key=value`.
    #[error("Expected key=value, got '{0}'")]
    MalformedOption(String),
}

impl HeadlessError {
    /// Whether this error ends the current episode.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Agent(AgentError::NotStarted) => false,
            Self::Agent(_) | Self::Io(_) => true,
            Self::Json(_) | Self::Ron { .. } | Self::MalformedOption(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        assert!(!HeadlessError::from(AgentError::NotStarted).is_fatal());
        assert!(HeadlessError::from(AgentError::InvariantViolation("x".into())).is_fatal());
        assert!(!HeadlessError::MalformedOption("seed".into()).is_fatal());
        let json = serde_json::from_str::<u32>("{").unwrap_err();
        assert!(!HeadlessError::from(json).is_fatal());
    }
}
