//! Persistence layer for GridWatch.
//!
//! Two durable artifacts: the agent-state record (atomic load/save behind
//! the [`StateStore`] trait) and the append-only decision log.

pub mod decision_log;
pub mod error;
pub mod store;

pub use decision_log::{DecisionKind, DecisionLog, DecisionRecord, StateDigest};
pub use error::{Result, StorageError};
pub use store::{FailingStateStore, FileStateStore, MemoryStateStore, StateStore};
