//! The grid monitoring agent service.
//!
//! Owns the single agent-state instance and exposes the four logical
//! operations: status, predict, recommend and feedback. Mutating cycles
//! are serialized behind one write lock and follow compute → persist →
//! return; readers get point-in-time copies.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use gridwatch_core::config::AgentConfig;
use gridwatch_core::error::{Error, Result};
use gridwatch_core::provider::{ForecastEntry, RatingProvider, WeatherParams};
use gridwatch_core::state::{AgentState, Thresholds};
use gridwatch_core::types::{Action, Feedback, GridSnapshot, Issue, Prediction};
use gridwatch_storage::{DecisionLog, StateStore};

use crate::detector;
use crate::learning::{self, Adjustment};
use crate::predictor::Predictor;
use crate::recommend;

/// Summary of the latest snapshot for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub timestamp: DateTime<Utc>,
    pub line_count: usize,
    pub avg_loading: f64,
    pub max_loading: f64,
    pub overloaded_lines: usize,
    pub high_stress_lines: usize,
}

impl SnapshotSummary {
    fn of(snapshot: &GridSnapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            line_count: snapshot.line_count(),
            avg_loading: snapshot.avg_loading,
            max_loading: snapshot.max_loading,
            overloaded_lines: snapshot.overloaded_lines,
            high_stress_lines: snapshot.high_stress_lines,
        }
    }
}

/// Read-only view of the agent returned by the status operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub enabled: bool,
    pub thresholds: Thresholds,
    pub history_size: usize,
    pub action_history_size: usize,
    pub last_updated: DateTime<Utc>,
    pub open_issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_snapshot: Option<SnapshotSummary>,
}

/// Acknowledgement returned after feedback is applied and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAck {
    pub action_id: String,
    /// What the learning rule did: "raised", "lowered" or "unchanged".
    pub adjustment: String,
    /// Thresholds after the adjustment.
    pub thresholds: Thresholds,
}

/// Autonomous grid monitoring agent.
///
/// Single-process decision loop: each operation runs to completion before
/// the next mutating one begins, guarded by the state lock.
pub struct GridMonitorAgent {
    config: AgentConfig,
    provider: Arc<dyn RatingProvider>,
    store: Arc<dyn StateStore>,
    decision_log: DecisionLog,
    predictor: Predictor,
    state: RwLock<AgentState>,
    open_issues: RwLock<Vec<Issue>>,
}

impl GridMonitorAgent {
    /// Create the agent, loading persisted state from the store.
    ///
    /// A missing or unreadable state record falls back to defaults inside
    /// the store; startup never fails on persistence.
    pub async fn start(
        config: AgentConfig,
        provider: Arc<dyn RatingProvider>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let state = store.load().await;
        info!(
            history = state.history.len(),
            actions = state.action_history.len(),
            enabled = config.enabled,
            "grid monitor agent started"
        );
        let decision_log = DecisionLog::new(&config.decision_log_path);
        Self {
            predictor: Predictor::new(provider.clone()),
            provider,
            store,
            decision_log,
            state: RwLock::new(state),
            open_issues: RwLock::new(Vec::new()),
            config,
        }
    }

    /// Current thresholds, history sizes and open issues. Never mutates.
    pub async fn status(&self) -> Result<AgentStatus> {
        self.ensure_enabled()?;
        let state = self.state.read().await;
        let open_issues = self.open_issues.read().await.clone();
        Ok(AgentStatus {
            enabled: true,
            thresholds: state.thresholds,
            history_size: state.history.len(),
            action_history_size: state.action_history.len(),
            last_updated: state.last_updated,
            open_issues,
            latest_snapshot: state.history.back().map(SnapshotSummary::of),
        })
    }

    /// Project loading and risk across a weather forecast.
    pub async fn predict(&self, forecast: &[ForecastEntry]) -> Result<Vec<Prediction>> {
        self.ensure_enabled()?;
        let thresholds = self.state.read().await.thresholds;
        let predictions = self.predictor.predict(forecast, &thresholds).await?;

        let state = self.state.read().await;
        self.decision_log
            .predictions_generated(forecast.len(), &state)
            .await;
        Ok(predictions)
    }

    /// Generate ranked mitigation actions.
    ///
    /// With `weather` supplied, a detection pass runs first: the provider
    /// computes current ratings, the detector scans them against history
    /// and appends the snapshot. Without weather, recommendations come
    /// from the issues of the last detection pass. Generated actions are
    /// appended to the bounded action history and the state is persisted.
    pub async fn recommend(
        &self,
        weather: Option<WeatherParams>,
        limit: Option<usize>,
    ) -> Result<Vec<Action>> {
        self.ensure_enabled()?;

        // Provider call happens before any state mutation, so an upstream
        // failure aborts the cycle with history intact.
        let fresh_lines = match &weather {
            Some(weather) => Some(self.provider.compute_ratings(weather).await?),
            None => None,
        };

        let mut state = self.state.write().await;
        let issues = match fresh_lines {
            Some(lines) => {
                let snapshot = GridSnapshot::from_lines(Utc::now(), lines);
                let issues = detector::detect(snapshot, &mut state);
                for issue in &issues {
                    self.decision_log.issue_detected(issue, &state).await;
                }
                *self.open_issues.write().await = issues.clone();
                debug!(count = issues.len(), "detection pass complete");
                issues
            }
            None => self.open_issues.read().await.clone(),
        };

        let limit = limit.unwrap_or(self.config.recommendation_limit);
        let actions = recommend::recommend(&issues, limit, Utc::now());
        for action in &actions {
            state.push_action(action.clone());
        }
        self.decision_log
            .recommendations_generated(&actions, &state)
            .await;

        self.persist(&state).await?;
        Ok(actions)
    }

    /// Apply operator feedback on a past recommendation and persist the
    /// threshold change.
    pub async fn feedback(&self, feedback: Feedback) -> Result<FeedbackAck> {
        self.ensure_enabled()?;

        let mut state = self.state.write().await;
        let adjustment = learning::apply_feedback(&feedback, &mut state)?;
        self.decision_log.feedback_applied(&feedback, &state).await;
        self.persist(&state).await?;

        Ok(FeedbackAck {
            action_id: feedback.action_id,
            adjustment: match adjustment {
                Adjustment::Raised(_) => "raised".to_string(),
                Adjustment::Lowered(_) => "lowered".to_string(),
                Adjustment::Unchanged => "unchanged".to_string(),
            },
            thresholds: state.thresholds,
        })
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.config.enabled {
            Ok(())
        } else {
            Err(Error::AgentDisabled)
        }
    }

    async fn persist(&self, state: &AgentState) -> Result<()> {
        if !self.config.persistence {
            return Ok(());
        }
        self.store.save(state).await.map_err(Error::from)
    }
}
