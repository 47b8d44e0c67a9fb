//! Core data types for grid monitoring: snapshots, issues, actions,
//! feedback and predictions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thermal loading of a single transmission line under one weather case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineLoading {
    /// Thermal rating in MVA, from the IEEE-738 rating provider.
    pub rating_mva: f64,
    /// Actual power flow in MVA.
    pub flow_mva: f64,
    /// Flow as a percentage of rating.
    pub loading_pct: f64,
    /// Remaining headroom in MVA (rating minus flow; negative when overloaded).
    pub margin_mva: f64,
}

impl LineLoading {
    /// Build a line loading record from rating and flow.
    pub fn new(rating_mva: f64, flow_mva: f64) -> Self {
        let loading_pct = if rating_mva > 0.0 {
            flow_mva / rating_mva * 100.0
        } else {
            0.0
        };
        Self {
            rating_mva,
            flow_mva,
            loading_pct,
            margin_mva: rating_mva - flow_mva,
        }
    }
}

/// One timestamped observation of grid-wide loading.
///
/// Immutable once created; appended to the bounded state history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Observation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Per-line loading, keyed by line identifier.
    pub lines: HashMap<String, LineLoading>,
    /// Mean loading percentage across all lines.
    pub avg_loading: f64,
    /// Maximum loading percentage across all lines.
    pub max_loading: f64,
    /// Lines at or above 100% loading.
    pub overloaded_lines: usize,
    /// Lines at or above the high-loading watch level (90%).
    pub high_stress_lines: usize,
}

impl GridSnapshot {
    /// Summarize a per-line loading map into a snapshot.
    pub fn from_lines(timestamp: DateTime<Utc>, lines: HashMap<String, LineLoading>) -> Self {
        let n = lines.len();
        let (avg_loading, max_loading) = if n == 0 {
            (0.0, 0.0)
        } else {
            let sum: f64 = lines.values().map(|l| l.loading_pct).sum();
            let max = lines
                .values()
                .map(|l| l.loading_pct)
                .fold(f64::NEG_INFINITY, f64::max);
            (sum / n as f64, max)
        };
        let overloaded_lines = lines.values().filter(|l| l.loading_pct >= 100.0).count();
        let high_stress_lines = lines.values().filter(|l| l.loading_pct >= 90.0).count();

        Self {
            timestamp,
            lines,
            avg_loading,
            max_loading,
            overloaded_lines,
            high_stress_lines,
        }
    }

    /// Number of lines observed in this snapshot.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Kind of detected condition.
///
/// Declaration order is recommendation priority: earlier kinds outrank
/// later ones when actions are sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    CriticalLoading,
    HighLoading,
    RisingTrend,
    RatingDecline,
    StatisticalAnomaly,
}

impl IssueKind {
    /// Priority rank, 1 = highest.
    pub fn priority(&self) -> u8 {
        match self {
            Self::CriticalLoading => 1,
            Self::HighLoading => 2,
            Self::RisingTrend => 3,
            Self::RatingDecline => 4,
            Self::StatisticalAnomaly => 5,
        }
    }

    /// Stable name used in identifiers and log records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CriticalLoading => "critical_loading",
            Self::HighLoading => "high_loading",
            Self::RisingTrend => "rising_trend",
            Self::RatingDecline => "rating_decline",
            Self::StatisticalAnomaly => "statistical_anomaly",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Severity of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A detected grid condition.
///
/// Created by the issue detector, never mutated afterwards; consumed by
/// the recommendation engine and the decision log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// What was detected.
    pub kind: IssueKind,
    /// Issue severity.
    pub severity: Severity,
    /// Affected line identifiers; `["system-wide"]` for fleet-level issues.
    pub affected_lines: Vec<String>,
    /// Human-readable description of the detection.
    pub reason: String,
    /// Detection confidence in [0, 1].
    pub confidence: f64,
    /// Supporting metric values (the measurement and the threshold crossed).
    pub evidence: HashMap<String, f64>,
    /// When the issue was detected.
    pub timestamp: DateTime<Utc>,
}

/// Estimated effect of a mitigation action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatedImpact {
    /// Expected change in flow, MVA (negative = relief).
    pub delta_mva: f64,
    /// Expected change in loading percentage (negative = relief).
    pub delta_loading_pct: f64,
}

/// A proposed mitigation, ranked and quantified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier, referenced later by operator feedback.
    pub id: String,
    /// Priority rank, 1 = act first.
    pub priority: u8,
    /// Issue kind this action mitigates.
    pub kind: IssueKind,
    /// What the operator should do.
    pub description: String,
    /// Estimated effect of taking the action.
    pub estimated_impact: EstimatedImpact,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Why the action is recommended.
    pub justification: String,
    /// When the recommendation was generated.
    pub created_at: DateTime<Utc>,
}

/// Operator verdict on a past recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackOutcome {
    /// Operator took the recommended action.
    Accepted,
    /// Operator declined the recommendation.
    Rejected,
}

/// Operator feedback on a prior action.
///
/// Consumed once by the learning module; retained only in the decision log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Identifier of the action being judged.
    pub action_id: String,
    /// Accepted or rejected.
    pub outcome: FeedbackOutcome,
    /// For accepted actions: whether the action resolved the issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Optional numeric outcome metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<HashMap<String, f64>>,
    /// Free-text operator notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Feedback {
    /// Validate the feedback at the boundary before it reaches the
    /// learning module.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.action_id.trim().is_empty() {
            return Err(crate::error::Error::Validation(
                "feedback requires a non-empty action_id".to_string(),
            ));
        }
        Ok(())
    }
}

/// Risk level assigned to a line in a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Predicted per-line state for one forecast entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Forecast timestamp this prediction applies to.
    pub timestamp: DateTime<Utc>,
    /// Predicted per-line loading, keyed by line identifier.
    pub lines: HashMap<String, LineLoading>,
    /// Per-line risk level derived from the detection thresholds.
    pub risk_levels: HashMap<String, RiskLevel>,
    /// Model confidence; fixed for the deterministic physical model.
    pub confidence: f64,
}
