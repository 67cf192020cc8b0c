//! ReportSink port - タスク結果の出力先
//!
//! Formatting only. A sink has no failure modes of its own and never
//! influences the batch.

use crate::app::BatchSummary;
use crate::domain::{ChatId, Execution};

/// Where per-task reports and the end-of-batch marker go.
pub trait ReportSink: Send + Sync {
    /// Called once per task, in batch order, whatever the outcome.
    fn report(&self, position: TaskPosition, chat_id: ChatId, execution: &Execution);

    /// End-of-batch marker.
    fn batch_finished(&self, summary: &BatchSummary);

    /// Terminal marker when the session could not be established.
    fn batch_aborted(&self, reason: &str);
}

/// 1-based position of a task in its batch, for "task 2/5" style output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPosition {
    pub number: usize,
    pub total: usize,
}
