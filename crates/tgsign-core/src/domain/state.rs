//! Batch state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle of one batch run.
///
/// State transitions:
/// - Idle -> SessionEstablishing -> Running(0) -> ... -> Running(n-1) -> Done
/// - SessionEstablishing -> Done (empty batch)
/// - SessionEstablishing -> Aborted (session failure, no task runs)
///
/// `Running(i) -> Running(i + 1)` happens regardless of the task outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "task_index", rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    SessionEstablishing,
    Running(usize),
    Done,
    Aborted,
}

impl BatchState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchState::Done | BatchState::Aborted)
    }

    pub fn can_transition_to(self, next: BatchState) -> bool {
        use BatchState::*;
        match (self, next) {
            (Idle, SessionEstablishing) => true,
            (SessionEstablishing, Running(0) | Done | Aborted) => true,
            (Running(i), Running(j)) => j == i + 1,
            (Running(_), Done) => true,
            _ => false,
        }
    }
}
