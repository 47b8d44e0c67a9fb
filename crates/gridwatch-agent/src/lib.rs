//! The GridWatch decision loop.
//!
//! A closed sense → predict → recommend → learn cycle over transmission
//! line thermal loading: statistical issue detection against a bounded
//! history, physics-backed risk prediction through the rating provider,
//! ranked mitigation recommendations, and threshold learning from
//! operator feedback. Every transition lands in the decision log and the
//! agent state is persisted crash-safely after each mutation.

pub mod detector;
pub mod learning;
pub mod monitor;
pub mod predictor;
pub mod recommend;

pub use learning::{Adjustment, FEEDBACK_STEP};
pub use monitor::{AgentStatus, FeedbackAck, GridMonitorAgent, SnapshotSummary};
pub use predictor::{Predictor, PREDICTION_CONFIDENCE};

// Re-exports so callers can hold one dependency.
pub use gridwatch_core::prelude::*;
pub use gridwatch_storage::{DecisionLog, FileStateStore, MemoryStateStore, StateStore};
