//! Append-only audit trail of agent decisions.
//!
//! One structured JSON line per detection, recommendation, prediction and
//! feedback event. The log is never rewritten or compacted here; rotation
//! is an external concern. Write failures must not stall the decision
//! loop, so they are demoted to warnings.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use gridwatch_core::state::AgentState;
use gridwatch_core::types::{Action, Feedback, Issue};

/// What kind of decision produced a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    IssueDetected,
    RecommendationsGenerated,
    PredictionsGenerated,
    FeedbackApplied,
}

/// Compact view of the agent state at decision time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDigest {
    pub history_size: usize,
    pub action_history_size: usize,
    pub thresholds: gridwatch_core::Thresholds,
}

impl StateDigest {
    pub fn of(state: &AgentState) -> Self {
        Self {
            history_size: state.history.len(),
            action_history_size: state.action_history.len(),
            thresholds: state.thresholds,
        }
    }
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// When the record was written.
    pub timestamp: DateTime<Utc>,
    /// Decision category.
    pub kind: DecisionKind,
    /// Event payload: the issue, the action batch, the feedback, or a
    /// prediction summary.
    pub details: serde_json::Value,
    /// Agent state at the time of the decision.
    pub state: StateDigest,
}

/// Append-only decision logger.
pub struct DecisionLog {
    path: PathBuf,
}

impl DecisionLog {
    /// Create a logger writing to the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log a detected issue.
    pub async fn issue_detected(&self, issue: &Issue, state: &AgentState) {
        let details = match serde_json::to_value(issue) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "failed to serialize issue for decision log");
                return;
            }
        };
        self.append(DecisionKind::IssueDetected, details, state).await;
    }

    /// Log a generated recommendation batch.
    pub async fn recommendations_generated(&self, actions: &[Action], state: &AgentState) {
        let details = serde_json::json!({
            "count": actions.len(),
            "ids": actions.iter().map(|a| a.id.clone()).collect::<Vec<_>>(),
            "top_priority": actions.first().map(|a| a.priority),
        });
        self.append(DecisionKind::RecommendationsGenerated, details, state)
            .await;
    }

    /// Log a completed prediction run.
    pub async fn predictions_generated(&self, forecast_count: usize, state: &AgentState) {
        let details = serde_json::json!({ "forecast_count": forecast_count });
        self.append(DecisionKind::PredictionsGenerated, details, state)
            .await;
    }

    /// Log applied operator feedback.
    pub async fn feedback_applied(&self, feedback: &Feedback, state: &AgentState) {
        let details = match serde_json::to_value(feedback) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "failed to serialize feedback for decision log");
                return;
            }
        };
        self.append(DecisionKind::FeedbackApplied, details, state).await;
    }

    async fn append(&self, kind: DecisionKind, details: serde_json::Value, state: &AgentState) {
        let record = DecisionRecord {
            timestamp: Utc::now(),
            kind,
            details,
            state: StateDigest::of(state),
        };
        if let Err(e) = self.write_record(&record).await {
            warn!(path = %self.path.display(), error = %e, "decision log write failed");
        }
    }

    async fn write_record(&self, record: &DecisionRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        Ok(())
    }
}
