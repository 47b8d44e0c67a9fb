//! Core traits and types for GridWatch.
//!
//! This crate defines the foundational abstractions used across the
//! project: grid snapshots, detected issues, recommendations, operator
//! feedback, the persistent agent state, and the consumed rating-provider
//! interface.

pub mod config;
pub mod error;
pub mod provider;
pub mod state;
pub mod types;

pub use config::AgentConfig;
pub use error::{Error, Result};
pub use provider::{ForecastEntry, ProviderError, RatingProvider, WeatherParams};
pub use state::{
    AgentState, Thresholds, ACTION_HISTORY_CAPACITY, HISTORY_CAPACITY, THRESHOLD_MAX,
    THRESHOLD_MIN,
};
pub use types::{
    Action, EstimatedImpact, Feedback, FeedbackOutcome, GridSnapshot, Issue, IssueKind,
    LineLoading, Prediction, RiskLevel, Severity,
};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::config::AgentConfig;
    pub use crate::error::{Error, Result};
    pub use crate::provider::{ForecastEntry, ProviderError, RatingProvider, WeatherParams};
    pub use crate::state::{AgentState, Thresholds};
    pub use crate::types::{
        Action, EstimatedImpact, Feedback, FeedbackOutcome, GridSnapshot, Issue, IssueKind,
        LineLoading, Prediction, RiskLevel, Severity,
    };
}
