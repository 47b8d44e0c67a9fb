//! Agent configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the grid monitoring agent.
///
/// Mirrors the deployment switches: the agent can be administratively
/// disabled, and persistence can be turned off for ephemeral runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Whether the agent is enabled. When false, every operation returns
    /// a disabled error without touching state.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Whether mutating operations write state to durable storage.
    #[serde(default = "default_enabled")]
    pub persistence: bool,
    /// Location of the durable agent state record.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    /// Location of the append-only decision log.
    #[serde(default = "default_decision_log_path")]
    pub decision_log_path: PathBuf,
    /// Default cap on recommendations returned per run.
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_state_path() -> PathBuf {
    PathBuf::from("data/agent_state.json")
}

fn default_decision_log_path() -> PathBuf {
    PathBuf::from("data/agent_decisions.log")
}

fn default_recommendation_limit() -> usize {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            persistence: default_enabled(),
            state_path: default_state_path(),
            decision_log_path: default_decision_log_path(),
            recommendation_limit: default_recommendation_limit(),
        }
    }
}
