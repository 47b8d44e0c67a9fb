//! Threshold learning from operator feedback.
//!
//! The rule is intentionally a fixed additive step so that every
//! adjustment stays auditable and explainable to an operator: rejection
//! raises the alert-sensitivity threshold (fewer alerts), an
//! accepted-but-failed action lowers it (alert sooner), and an accepted
//! successful action confirms the current tuning.

use tracing::info;

use gridwatch_core::error::{Error, Result};
use gridwatch_core::state::AgentState;
use gridwatch_core::types::{Feedback, FeedbackOutcome, IssueKind};

/// Threshold change applied per feedback event, in loading percent.
pub const FEEDBACK_STEP: f64 = 2.0;

/// How a feedback event changed the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Threshold raised: the agent alerts less aggressively.
    Raised(IssueKind),
    /// Threshold lowered: the agent alerts sooner.
    Lowered(IssueKind),
    /// Successful action, tuning confirmed.
    Unchanged,
}

/// Apply operator feedback to the agent state.
///
/// Fails with [`Error::UnknownAction`] when the referenced action is not
/// in the action history, leaving the state untouched.
pub fn apply_feedback(feedback: &Feedback, state: &mut AgentState) -> Result<Adjustment> {
    feedback.validate()?;

    let kind = state
        .find_action(&feedback.action_id)
        .map(|a| a.kind)
        .ok_or_else(|| Error::UnknownAction(feedback.action_id.clone()))?;

    let adjustment = match feedback.outcome {
        FeedbackOutcome::Rejected => {
            state.thresholds.adjust(FEEDBACK_STEP);
            info!(
                action_id = %feedback.action_id,
                kind = %kind,
                "recommendation rejected, raising threshold"
            );
            Adjustment::Raised(kind)
        }
        FeedbackOutcome::Accepted => {
            if feedback.success.unwrap_or(false) {
                info!(
                    action_id = %feedback.action_id,
                    "action successful, thresholds maintained"
                );
                Adjustment::Unchanged
            } else {
                state.thresholds.adjust(-FEEDBACK_STEP);
                info!(
                    action_id = %feedback.action_id,
                    kind = %kind,
                    "action accepted but unsuccessful, lowering threshold"
                );
                Adjustment::Lowered(kind)
            }
        }
    };

    state.last_updated = chrono::Utc::now();
    Ok(adjustment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gridwatch_core::state::THRESHOLD_MAX;
    use gridwatch_core::types::{Action, EstimatedImpact};

    fn action(id: &str, kind: IssueKind) -> Action {
        Action {
            id: id.to_string(),
            priority: kind.priority(),
            kind,
            description: "test".to_string(),
            estimated_impact: EstimatedImpact {
                delta_mva: 0.0,
                delta_loading_pct: 0.0,
            },
            confidence: 0.8,
            justification: "test".to_string(),
            created_at: Utc::now(),
        }
    }

    fn feedback(id: &str, outcome: FeedbackOutcome, success: Option<bool>) -> Feedback {
        Feedback {
            action_id: id.to_string(),
            outcome,
            success,
            metrics: None,
            notes: None,
        }
    }

    #[test]
    fn rejection_raises_threshold_by_step() {
        let mut state = AgentState::default();
        state.push_action(action("a1", IssueKind::HighLoading));

        let adj =
            apply_feedback(&feedback("a1", FeedbackOutcome::Rejected, None), &mut state).unwrap();
        assert_eq!(adj, Adjustment::Raised(IssueKind::HighLoading));
        assert_eq!(state.thresholds.high_loading, 92.0);
    }

    #[test]
    fn rejection_clamps_at_95() {
        let mut state = AgentState::default();
        state.thresholds.high_loading = 94.0;
        state.push_action(action("a1", IssueKind::HighLoading));

        apply_feedback(&feedback("a1", FeedbackOutcome::Rejected, None), &mut state).unwrap();
        assert_eq!(state.thresholds.high_loading, THRESHOLD_MAX);
    }

    #[test]
    fn rejected_critical_feedback_never_lowers_the_cutoff() {
        let mut state = AgentState::default();
        let before = state.thresholds;
        state.push_action(action("a1", IssueKind::CriticalLoading));

        let adj =
            apply_feedback(&feedback("a1", FeedbackOutcome::Rejected, None), &mut state).unwrap();
        assert_eq!(adj, Adjustment::Raised(IssueKind::CriticalLoading));
        // Rejection makes the agent less aggressive: the critical cutoff
        // holds and the sensitivity threshold rises.
        assert!(state.thresholds.critical_loading >= before.critical_loading);
        assert_eq!(state.thresholds.critical_loading, 100.0);
        assert_eq!(state.thresholds.high_loading, 92.0);
    }

    #[test]
    fn accepted_failed_critical_feedback_lowers_sensitivity_by_one_step() {
        let mut state = AgentState::default();
        state.push_action(action("a1", IssueKind::CriticalLoading));

        apply_feedback(
            &feedback("a1", FeedbackOutcome::Accepted, Some(false)),
            &mut state,
        )
        .unwrap();
        assert_eq!(state.thresholds.high_loading, 88.0);
        assert_eq!(state.thresholds.critical_loading, 100.0);
    }

    #[test]
    fn accepted_failure_lowers_threshold() {
        let mut state = AgentState::default();
        state.push_action(action("a1", IssueKind::RisingTrend));

        let adj = apply_feedback(
            &feedback("a1", FeedbackOutcome::Accepted, Some(false)),
            &mut state,
        )
        .unwrap();
        assert_eq!(adj, Adjustment::Lowered(IssueKind::RisingTrend));
        assert_eq!(state.thresholds.high_loading, 88.0);
    }

    #[test]
    fn accepted_success_changes_nothing() {
        let mut state = AgentState::default();
        state.push_action(action("a1", IssueKind::HighLoading));
        let before = state.thresholds;

        let adj = apply_feedback(
            &feedback("a1", FeedbackOutcome::Accepted, Some(true)),
            &mut state,
        )
        .unwrap();
        assert_eq!(adj, Adjustment::Unchanged);
        assert_eq!(state.thresholds, before);
    }

    #[test]
    fn unknown_action_leaves_state_untouched() {
        let mut state = AgentState::default();
        state.push_action(action("a1", IssueKind::HighLoading));
        let before = state.clone();

        let err = apply_feedback(&feedback("ghost", FeedbackOutcome::Rejected, None), &mut state)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAction(_)));
        assert_eq!(state, before);
    }

    #[test]
    fn repeated_rejections_stay_within_bounds() {
        let mut state = AgentState::default();
        state.push_action(action("a1", IssueKind::HighLoading));

        for _ in 0..50 {
            apply_feedback(&feedback("a1", FeedbackOutcome::Rejected, None), &mut state).unwrap();
        }
        assert_eq!(state.thresholds.high_loading, THRESHOLD_MAX);
    }
}
