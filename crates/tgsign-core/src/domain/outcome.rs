//! Outcome model: the structured result of one task execution.
//!
//! Every per-task failure ends up here as data. Nothing in this module knows
//! about the chat platform or how results get reported.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ChatId, ExecutionId};

/// Classification of a finished task.
///
/// Serialized with a `kind` tag in SCREAMING_SNAKE_CASE:
/// COMPLETED / RATE_LIMITED / FAILED.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskOutcome {
    /// Sent, and the reply window closed normally (possibly with no replies).
    Completed,

    /// Flood control hit; the task was abandoned for this run.
    RateLimited { wait_secs: u64 },

    /// Any other send/collect failure; the task was abandoned.
    Failed { reason: String },
}

/// Result of one task execution, created fresh per task and dropped after
/// being reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub execution_id: ExecutionId,

    /// Resolved display name, or `ID:<chat_id>` when resolution failed.
    pub target_name: String,

    pub chat_id: ChatId,

    pub sent_summary: String,

    /// Reply snippets in arrival order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<String>,

    pub outcome: TaskOutcome,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Why a task produced no `TaskResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingChatId,
}

/// What the executor hands back for one task: a result, or a skip marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Execution {
    Finished(TaskResult),
    Skipped { reason: SkipReason },
}

impl Execution {
    pub fn result(&self) -> Option<&TaskResult> {
        match self {
            Execution::Finished(result) => Some(result),
            Execution::Skipped { .. } => None,
        }
    }
}
