//! Errors - エラー型と分類
//!
//! 伝播するのは `ConfigError` と `SessionError` だけ。
//! タスク単位のエラー (`ChatError`) は executor で分類され、
//! `TaskOutcome` としてデータに変換されます。

use thiserror::Error;

use super::task::MessageType;

/// Failure reported by a chat client adapter.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("target not found: {0}")]
    NotFound(String),

    /// Platform flood control: the caller must wait `seconds` before retrying.
    #[error("flood wait: retry after {seconds}s")]
    FloodWait { seconds: u64 },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("api error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("network: {0}")]
    Network(String),

    #[error("decode: {0}")]
    Decode(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Advertised wait duration when this is a flood-control signal.
    pub fn flood_wait_secs(&self) -> Option<u64> {
        match self {
            ChatError::FloodWait { seconds } => Some(*seconds),
            _ => None,
        }
    }
}

/// A task record violates its construction-time invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskValidationError {
    #[error("{0} task requires a non-empty `text` field")]
    MissingText(MessageType),

    #[error("file task requires a non-empty `file` field")]
    MissingFile,
}

/// Fatal, pre-execution configuration problem.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("environment variable {0} is empty")]
    EmptyVar(&'static str),

    #[error("environment variable {name} is invalid: {reason}")]
    InvalidVar { name: &'static str, reason: String },

    #[error("task list is not valid JSON: {0}")]
    TaskList(#[source] serde_json::Error),

    #[error("task #{index} is invalid: {source}")]
    Task {
        index: usize,
        #[source]
        source: TaskValidationError,
    },
}

/// Fatal, per-run failure: the chat session could not be established.
#[derive(Debug, Error)]
#[error("session could not be established: {source}")]
pub struct SessionError {
    #[from]
    source: ChatError,
}

impl SessionError {
    pub fn chat_error(&self) -> &ChatError {
        &self.source
    }
}
