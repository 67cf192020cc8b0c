//! Sign task model: one scripted send-and-listen unit of work.
//!
//! A `SignTask` is validated once, when it is built from configuration, and
//! is immutable afterwards. Construction enforces the payload invariant so a
//! malformed batch is rejected before any chat traffic happens.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::errors::TaskValidationError;
use super::ids::ChatId;

/// Message type of a task. Determines payload formatting and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Markdown,
    Html,
    File,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Markdown => "markdown",
            MessageType::Html => "html",
            MessageType::File => "file",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format hint passed along with a text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Markdown,
    Html,
}

impl ParseMode {
    /// Name understood by the Bot API `parse_mode` field.
    pub fn as_api_str(self) -> &'static str {
        match self {
            ParseMode::Markdown => "Markdown",
            ParseMode::Html => "HTML",
        }
    }
}

/// What a task sends. Exactly one primary payload per message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPayload {
    Text(String),
    Markdown(String),
    Html(String),
    File {
        path: String,
        caption: Option<String>,
    },
}

impl TaskPayload {
    pub fn message_type(&self) -> MessageType {
        match self {
            TaskPayload::Text(_) => MessageType::Text,
            TaskPayload::Markdown(_) => MessageType::Markdown,
            TaskPayload::Html(_) => MessageType::Html,
            TaskPayload::File { .. } => MessageType::File,
        }
    }

    /// Format hint for text payloads. Plain text and files carry none.
    pub fn parse_mode(&self) -> Option<ParseMode> {
        match self {
            TaskPayload::Markdown(_) => Some(ParseMode::Markdown),
            TaskPayload::Html(_) => Some(ParseMode::Html),
            TaskPayload::Text(_) | TaskPayload::File { .. } => None,
        }
    }

    /// Human-readable description of what gets sent.
    pub fn summary(&self) -> String {
        match self {
            TaskPayload::Text(text) | TaskPayload::Markdown(text) | TaskPayload::Html(text) => {
                text.clone()
            }
            TaskPayload::File {
                path,
                caption: Some(caption),
            } => format!("{caption}: {path}"),
            TaskPayload::File {
                path,
                caption: None,
            } => format!("[file: {path}]"),
        }
    }

    fn validate(&self) -> Result<(), TaskValidationError> {
        match self {
            TaskPayload::Text(text) | TaskPayload::Markdown(text) | TaskPayload::Html(text) => {
                if text.trim().is_empty() {
                    return Err(TaskValidationError::MissingText(self.message_type()));
                }
            }
            TaskPayload::File { path, .. } => {
                if path.trim().is_empty() {
                    return Err(TaskValidationError::MissingFile);
                }
            }
        }
        Ok(())
    }
}

/// A validated, immutable task description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSignTask", into = "RawSignTask")]
pub struct SignTask {
    chat_id: ChatId,
    delay_secs: u64,
    payload: TaskPayload,
}

impl SignTask {
    pub fn new(
        chat_id: ChatId,
        delay_secs: u64,
        payload: TaskPayload,
    ) -> Result<Self, TaskValidationError> {
        payload.validate()?;
        let payload = match payload {
            TaskPayload::File { path, caption } => TaskPayload::File {
                path,
                caption: caption.filter(|c| !c.trim().is_empty()),
            },
            other => other,
        };
        Ok(Self {
            chat_id,
            delay_secs,
            payload,
        })
    }

    /// Shorthand for an immediate plain-text task.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Result<Self, TaskValidationError> {
        Self::new(ChatId::new(chat_id), 0, TaskPayload::Text(text.into()))
    }

    pub fn with_delay(mut self, delay_secs: u64) -> Self {
        self.delay_secs = delay_secs;
        self
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn payload(&self) -> &TaskPayload {
        &self.payload
    }
}

/// Wire shape of a task record as it appears in configuration.
///
/// Missing `chat_id` fails deserialization; a negative `delay` fails as well
/// since it cannot be read into `u64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSignTask {
    pub chat_id: ChatId,

    #[serde(rename = "type", default)]
    pub message_type: MessageType,

    #[serde(default)]
    pub delay: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl TryFrom<RawSignTask> for SignTask {
    type Error = TaskValidationError;

    fn try_from(raw: RawSignTask) -> Result<Self, Self::Error> {
        let payload = match raw.message_type {
            MessageType::File => TaskPayload::File {
                path: raw.file.ok_or(TaskValidationError::MissingFile)?,
                caption: raw.caption,
            },
            other => {
                let text = raw.text.ok_or(TaskValidationError::MissingText(other))?;
                match other {
                    MessageType::Markdown => TaskPayload::Markdown(text),
                    MessageType::Html => TaskPayload::Html(text),
                    _ => TaskPayload::Text(text),
                }
            }
        };
        SignTask::new(raw.chat_id, raw.delay, payload)
    }
}

impl From<SignTask> for RawSignTask {
    fn from(task: SignTask) -> Self {
        let message_type = task.message_type();
        let (text, file, caption) = match task.payload {
            TaskPayload::Text(t) | TaskPayload::Markdown(t) | TaskPayload::Html(t) => {
                (Some(t), None, None)
            }
            TaskPayload::File { path, caption } => (None, Some(path), caption),
        };
        Self {
            chat_id: task.chat_id,
            message_type,
            delay: task.delay_secs,
            text,
            file,
            caption,
        }
    }
}
