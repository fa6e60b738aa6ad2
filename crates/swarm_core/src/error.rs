//! Error types for the decision pipeline.
//!
//! Routine churn (stale tags, unaffordable or unplaceable goals) is never an
//! error: those cases are no-ops for the current tick. Only configuration
//! mistakes, broken static data and identity-continuity violations surface
//! here.

use thiserror::Error;

/// Result type alias using [`AgentError`].
pub type Result<T> = std::result::Result<T, AgentError>;

/// Top-level error type for the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A strategy selector was given a value it does not know.
    #[error("Unknown {selector} strategy: '{value}'")]
    UnknownStrategy {
        /// Which selector was misconfigured.
        selector: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A recognised option was given a malformed value.
    #[error("Invalid value for option '{name}': '{value}'")]
    InvalidOption {
        /// Option name.
        name: String,
        /// The rejected value.
        value: String,
    },

    /// An agent configuration file failed to parse.
    #[error("Failed to parse agent config: {0}")]
    ConfigParse(String),

    /// The entity-continuity protocol produced an impossible state.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// The static tech table failed to parse.
    #[error("Failed to parse tech table: {0}")]
    DataParse(String),

    /// `step` was called before `on_start`.
    #[error("Agent stepped before on_start")]
    NotStarted,
}
