//! Issue detection: threshold breaches, loading trends, rating declines
//! and statistical anomalies.
//!
//! One detection pass runs four independent checks against the incoming
//! snapshot and the bounded state history. The pass appends the snapshot
//! to the history as a side effect and never mutates thresholds, so it is
//! deterministic given identical snapshot, history and thresholds.

use std::collections::HashMap;

use gridwatch_core::state::AgentState;
use gridwatch_core::types::{GridSnapshot, Issue, IssueKind, Severity};

/// Snapshots required before the trend regression runs.
const MIN_TREND_POINTS: usize = 5;

/// Historical points required per line before the z-score check runs.
const MIN_ANOMALY_POINTS: usize = 3;

/// Standard deviations from the rolling mean that flag an anomaly.
const ANOMALY_Z_THRESHOLD: f64 = 2.0;

/// Confidence for a direct critical-threshold breach.
const CRITICAL_CONFIDENCE: f64 = 0.95;

/// Confidence for a direct high-threshold breach.
const HIGH_CONFIDENCE: f64 = 0.8;

/// Run one detection pass.
///
/// Appends `snapshot` to the state history (respecting the bound) and
/// returns every issue found, per-line checks ordered by line name.
pub fn detect(snapshot: GridSnapshot, state: &mut AgentState) -> Vec<Issue> {
    let current = snapshot.clone();
    state.push_snapshot(snapshot);

    let mut issues = Vec::new();
    issues.extend(check_thresholds(&current, state));
    issues.extend(check_trend(&current, state));
    issues.extend(check_rating_decline(&current, state));
    issues.extend(check_anomalies(&current, state));
    issues
}

/// Per-line loading against the high/critical thresholds.
fn check_thresholds(current: &GridSnapshot, state: &AgentState) -> Vec<Issue> {
    let thresholds = &state.thresholds;
    let mut issues = Vec::new();

    for name in sorted_line_names(current) {
        let line = &current.lines[name];
        if line.loading_pct >= thresholds.critical_loading {
            issues.push(Issue {
                kind: IssueKind::CriticalLoading,
                severity: Severity::Critical,
                affected_lines: vec![name.clone()],
                reason: format!(
                    "line {} at {:.1}% loading, above the {:.1}% critical threshold",
                    name, line.loading_pct, thresholds.critical_loading
                ),
                confidence: CRITICAL_CONFIDENCE,
                evidence: HashMap::from([
                    ("loading_pct".to_string(), line.loading_pct),
                    ("threshold".to_string(), thresholds.critical_loading),
                    ("rating_mva".to_string(), line.rating_mva),
                    ("flow_mva".to_string(), line.flow_mva),
                    ("margin_mva".to_string(), line.margin_mva),
                ]),
                timestamp: current.timestamp,
            });
        } else if line.loading_pct >= thresholds.high_loading {
            issues.push(Issue {
                kind: IssueKind::HighLoading,
                severity: Severity::High,
                affected_lines: vec![name.clone()],
                reason: format!(
                    "line {} at {:.1}% loading, between the {:.1}% and {:.1}% thresholds",
                    name, line.loading_pct, thresholds.high_loading, thresholds.critical_loading
                ),
                confidence: HIGH_CONFIDENCE,
                evidence: HashMap::from([
                    ("loading_pct".to_string(), line.loading_pct),
                    ("threshold".to_string(), thresholds.high_loading),
                    ("rating_mva".to_string(), line.rating_mva),
                    ("flow_mva".to_string(), line.flow_mva),
                    ("margin_mva".to_string(), line.margin_mva),
                ]),
                timestamp: current.timestamp,
            });
        }
    }
    issues
}

/// Linear regression of average loading over the last snapshots.
fn check_trend(current: &GridSnapshot, state: &AgentState) -> Option<Issue> {
    if state.history.len() < MIN_TREND_POINTS {
        return None;
    }
    let recent = state.recent_avg_loadings(MIN_TREND_POINTS);
    let (slope, r_squared) = linear_fit(&recent);
    let threshold = state.thresholds.trend_slope;

    if slope <= 0.0 || slope < threshold {
        return None;
    }

    let confidence = ((slope / (threshold * 2.0)).min(1.0) * r_squared).clamp(0.0, 1.0);
    Some(Issue {
        kind: IssueKind::RisingTrend,
        severity: Severity::Medium,
        affected_lines: vec!["system-wide".to_string()],
        reason: format!(
            "average loading rising at {:.2}% per snapshot over the last {} snapshots",
            slope, MIN_TREND_POINTS
        ),
        confidence,
        evidence: HashMap::from([
            ("slope".to_string(), slope),
            ("r_squared".to_string(), r_squared),
            ("threshold".to_string(), threshold),
            ("projected_next".to_string(), current.avg_loading + slope),
        ]),
        timestamp: current.timestamp,
    })
}

/// Average loading jump against the previous snapshot, read as a
/// weather-driven decline in rating headroom.
fn check_rating_decline(current: &GridSnapshot, state: &AgentState) -> Option<Issue> {
    if state.history.len() < 2 {
        return None;
    }
    let prev_avg = state.history[state.history.len() - 2].avg_loading;
    let change = current.avg_loading - prev_avg;
    let threshold = state.thresholds.rating_decline;

    if change <= threshold {
        return None;
    }

    let confidence = (change / (threshold * 2.0)).min(1.0);
    Some(Issue {
        kind: IssueKind::RatingDecline,
        severity: Severity::Medium,
        affected_lines: vec!["system-wide".to_string()],
        reason: format!(
            "average loading jumped {:.1}% since the previous snapshot, likely a weather-driven rating decline",
            change
        ),
        confidence,
        evidence: HashMap::from([
            ("previous_avg_loading".to_string(), prev_avg),
            ("current_avg_loading".to_string(), current.avg_loading),
            ("change".to_string(), change),
            ("threshold".to_string(), threshold),
        ]),
        timestamp: current.timestamp,
    })
}

/// Per-line z-score against the rolling mean of the history window.
fn check_anomalies(current: &GridSnapshot, state: &AgentState) -> Vec<Issue> {
    let mut issues = Vec::new();
    // Baseline excludes the snapshot under scrutiny, which detect() has
    // already appended.
    let baseline_window = &state.history;
    let baseline_len = baseline_window.len().saturating_sub(1);

    for name in sorted_line_names(current) {
        let line = &current.lines[name];
        let historical: Vec<f64> = baseline_window
            .iter()
            .take(baseline_len)
            .filter_map(|s| s.lines.get(name).map(|l| l.loading_pct))
            .collect();
        if historical.len() < MIN_ANOMALY_POINTS {
            continue;
        }

        let mean = historical.iter().sum::<f64>() / historical.len() as f64;
        let variance =
            historical.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / historical.len() as f64;
        let std_dev = variance.sqrt();
        if std_dev == 0.0 {
            continue;
        }

        let z_score = (line.loading_pct - mean) / std_dev;
        if z_score.abs() <= ANOMALY_Z_THRESHOLD {
            continue;
        }

        let severity = if z_score.abs() > 3.0 {
            Severity::High
        } else {
            Severity::Medium
        };
        issues.push(Issue {
            kind: IssueKind::StatisticalAnomaly,
            severity,
            affected_lines: vec![name.clone()],
            reason: format!(
                "line {} loading ({:.1}%) deviates {:.1} standard deviations from its baseline",
                name,
                line.loading_pct,
                z_score.abs()
            ),
            confidence: (z_score.abs() / 4.0).min(1.0),
            evidence: HashMap::from([
                ("loading_pct".to_string(), line.loading_pct),
                ("baseline_mean".to_string(), mean),
                ("baseline_std".to_string(), std_dev),
                ("z_score".to_string(), z_score),
            ]),
            timestamp: current.timestamp,
        });
    }
    issues
}

/// Least-squares slope and coefficient of determination for evenly
/// spaced samples.
fn linear_fit(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.len() < 2 {
        return (0.0, 0.0);
    }

    let mean_x = (values.len() - 1) as f64 / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_yy = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        sum_xy += dx * dy;
        sum_xx += dx * dx;
        sum_yy += dy * dy;
    }

    let slope = sum_xy / sum_xx;
    let r_squared = if sum_yy == 0.0 {
        0.0
    } else {
        (sum_xy * sum_xy) / (sum_xx * sum_yy)
    };
    (slope, r_squared)
}

fn sorted_line_names(snapshot: &GridSnapshot) -> Vec<&String> {
    let mut names: Vec<&String> = snapshot.lines.keys().collect();
    names.sort();
    names
}
