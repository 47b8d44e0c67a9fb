//! Persistent agent state: bounded histories and adaptive thresholds.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Action, GridSnapshot};

/// Maximum snapshots retained for trend analysis.
pub const HISTORY_CAPACITY: usize = 10;

/// Maximum recommendations retained for feedback lookup.
pub const ACTION_HISTORY_CAPACITY: usize = 100;

/// Hard bounds applied to every threshold adjustment.
pub const THRESHOLD_MIN: f64 = 50.0;
pub const THRESHOLD_MAX: f64 = 95.0;

/// Detection thresholds, tuned by operator feedback.
///
/// Defaults match the shipped configuration; adjustments are clamped to
/// `[THRESHOLD_MIN, THRESHOLD_MAX]` and `critical_loading` is kept at or
/// above `high_loading`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Loading percentage that marks a line as highly stressed.
    #[serde(default = "default_high_loading")]
    pub high_loading: f64,
    /// Loading percentage that marks a line as critically overloaded.
    #[serde(default = "default_critical_loading")]
    pub critical_loading: f64,
    /// Minimum average-loading slope (% per snapshot) for a rising trend.
    #[serde(default = "default_trend_slope")]
    pub trend_slope: f64,
    /// Minimum average-loading jump (%) treated as a rating decline.
    #[serde(default = "default_rating_decline")]
    pub rating_decline: f64,
}

fn default_high_loading() -> f64 {
    90.0
}

fn default_critical_loading() -> f64 {
    100.0
}

fn default_trend_slope() -> f64 {
    5.0
}

fn default_rating_decline() -> f64 {
    10.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high_loading: default_high_loading(),
            critical_loading: default_critical_loading(),
            trend_slope: default_trend_slope(),
            rating_decline: default_rating_decline(),
        }
    }
}

impl Thresholds {
    /// Apply a feedback-driven adjustment.
    ///
    /// Feedback always tunes `high_loading`, the knob that governs overall
    /// alert sensitivity. `critical_loading` is never moved by feedback:
    /// its default sits above the clamp, so clamping an adjustment there
    /// would reverse the adjustment's direction. The result is clamped to
    /// the hard bounds and `critical_loading >= high_loading` is restored
    /// afterwards.
    pub fn adjust(&mut self, delta: f64) {
        self.high_loading = (self.high_loading + delta).clamp(THRESHOLD_MIN, THRESHOLD_MAX);
        if self.critical_loading < self.high_loading {
            self.critical_loading = self.high_loading;
        }
    }
}

/// The aggregate root persisted across restarts.
///
/// Bounded snapshot and action histories, current thresholds and the
/// last-update timestamp. Constructed fresh when no durable record exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Recent grid snapshots, oldest first. Bounded by [`HISTORY_CAPACITY`].
    #[serde(default)]
    pub history: VecDeque<GridSnapshot>,
    /// Recent recommendations, oldest first. Bounded by
    /// [`ACTION_HISTORY_CAPACITY`].
    #[serde(default)]
    pub action_history: VecDeque<Action>,
    /// Current detection thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,
    /// State schema version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Timestamp of the last mutating operation.
    pub last_updated: DateTime<Utc>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            history: VecDeque::new(),
            action_history: VecDeque::new(),
            thresholds: Thresholds::default(),
            version: default_version(),
            last_updated: Utc::now(),
        }
    }
}

impl AgentState {
    /// Append a snapshot, evicting the oldest once the bound is reached.
    pub fn push_snapshot(&mut self, snapshot: GridSnapshot) {
        if self.history.len() >= HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(snapshot);
        self.last_updated = Utc::now();
    }

    /// Append a recommendation, evicting the oldest once the bound is reached.
    pub fn push_action(&mut self, action: Action) {
        if self.action_history.len() >= ACTION_HISTORY_CAPACITY {
            self.action_history.pop_front();
        }
        self.action_history.push_back(action);
        self.last_updated = Utc::now();
    }

    /// Look up a past recommendation by id.
    pub fn find_action(&self, action_id: &str) -> Option<&Action> {
        self.action_history.iter().find(|a| a.id == action_id)
    }

    /// Average loading of the most recent snapshots, oldest first.
    pub fn recent_avg_loadings(&self, count: usize) -> Vec<f64> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).map(|s| s.avg_loading).collect()
    }
}
