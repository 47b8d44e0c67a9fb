//! Recommendation engine: turns detected issues into ranked, quantified
//! mitigation actions.

use chrono::{DateTime, Utc};

use gridwatch_core::types::{Action, EstimatedImpact, Issue, IssueKind};

/// Generate prioritized actions for a batch of issues.
///
/// Ordering: issue-kind priority (critical loading first), ties broken by
/// descending confidence. The list is truncated to `limit` and every
/// action receives an identifier unique within the run and across runs
/// with differing timestamps.
pub fn recommend(issues: &[Issue], limit: usize, now: DateTime<Utc>) -> Vec<Action> {
    let mut ranked: Vec<&Issue> = issues.iter().collect();
    ranked.sort_by(|a, b| {
        a.kind
            .priority()
            .cmp(&b.kind.priority())
            .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
    });

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(ordinal, issue)| build_action(issue, ordinal, now))
        .collect()
}

fn build_action(issue: &Issue, ordinal: usize, now: DateTime<Utc>) -> Action {
    let (description, rationale) = template_for(issue.kind);
    Action {
        id: format!("{}-{}-{}", now.timestamp_millis(), issue.kind.name(), ordinal),
        priority: issue.kind.priority(),
        kind: issue.kind,
        description: description.to_string(),
        estimated_impact: impact_for(issue),
        confidence: issue.confidence,
        justification: format!("{}. {}", issue.reason, rationale),
        created_at: now,
    }
}

/// Canned action template per issue kind.
fn template_for(kind: IssueKind) -> (&'static str, &'static str) {
    match kind {
        IssueKind::CriticalLoading => (
            "Immediate load shedding or line switching",
            "Critical overload requires immediate action to prevent equipment damage",
        ),
        IssueKind::HighLoading => (
            "Prepare contingency plans and increase monitoring",
            "High loading indicates potential for overload with minor changes",
        ),
        IssueKind::RisingTrend => (
            "Review load forecast and adjust generation schedule",
            "Proactive adjustment can prevent future overloads",
        ),
        IssueKind::RatingDecline => (
            "Monitor weather forecast and prepare for further rating reductions",
            "Weather conditions may continue to degrade line ratings",
        ),
        IssueKind::StatisticalAnomaly => (
            "Investigate cause of sudden loading change",
            "Unexpected changes may indicate equipment issues or data anomalies",
        ),
    }
}

/// Quantified impact estimate from the issue's evidence.
///
/// For loading breaches this is the relief needed to bring the line back
/// under the crossed threshold; for trends it is the slope reversal; the
/// watch-and-investigate kinds carry no load change.
fn impact_for(issue: &Issue) -> EstimatedImpact {
    match issue.kind {
        IssueKind::CriticalLoading | IssueKind::HighLoading => {
            let loading = issue.evidence.get("loading_pct").copied().unwrap_or(0.0);
            let threshold = issue.evidence.get("threshold").copied().unwrap_or(0.0);
            let rating = issue.evidence.get("rating_mva").copied().unwrap_or(0.0);
            let flow = issue.evidence.get("flow_mva").copied().unwrap_or(0.0);
            EstimatedImpact {
                delta_mva: rating * threshold / 100.0 - flow,
                delta_loading_pct: threshold - loading,
            }
        }
        IssueKind::RisingTrend => {
            let slope = issue.evidence.get("slope").copied().unwrap_or(0.0);
            EstimatedImpact {
                delta_mva: -slope * 10.0,
                delta_loading_pct: -slope,
            }
        }
        IssueKind::RatingDecline | IssueKind::StatisticalAnomaly => EstimatedImpact {
            delta_mva: 0.0,
            delta_loading_pct: 0.0,
        },
    }
}
