//! Shared error taxonomy for GridWatch.

use thiserror::Error;

/// Result type used across GridWatch crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error taxonomy.
///
/// Variants map one-to-one onto the failure classes the agent can surface
/// to its caller: administrative, upstream, reference, persistence and
/// validation failures. Decision-log write failures never appear here —
/// they are demoted to warnings at the call site.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent is administratively disabled; no state was touched.
    #[error("agent is disabled; enable it in the agent configuration")]
    AgentDisabled,

    /// Rating provider failed to produce ratings for a request.
    #[error("rating provider error: {0}")]
    Provider(String),

    /// Feedback referenced an action id that is not in the action history.
    #[error("unknown action id: {0}")]
    UnknownAction(String),

    /// Persistence failure while saving agent state.
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed input rejected at the boundary.
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
