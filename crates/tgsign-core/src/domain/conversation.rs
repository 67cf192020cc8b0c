//! Chat-side values exchanged with the adapter.

use serde::{Deserialize, Serialize};

use super::ids::ChatId;

/// Placeholder recorded for replies that carry no text (stickers, photos, ...).
pub const NON_TEXT_PLACEHOLDER: &str = "[non-text message]";

/// The logged-in account, returned when a session is established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// A resolved destination. Fields mirror what platforms usually expose:
/// groups and channels have a title, users have names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntity {
    pub id: ChatId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl ChatEntity {
    /// Richest available name: title, then first (+ last) name, then @username.
    pub fn display_name(&self) -> String {
        if let Some(title) = non_empty(&self.title) {
            return title.to_string();
        }
        if let Some(first) = non_empty(&self.first_name) {
            return match non_empty(&self.last_name) {
                Some(last) => format!("{first} {last}"),
                None => first.to_string(),
            };
        }
        if let Some(username) = non_empty(&self.username) {
            return format!("@{username}");
        }
        "Unknown".to_string()
    }

    /// Name used when the target cannot be resolved.
    pub fn fallback_name(chat_id: ChatId) -> String {
        format!("ID:{chat_id}")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Acknowledgement of a message we sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub message_id: i64,
}

/// A message that arrived in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub message_id: i64,
    #[serde(default)]
    pub text: Option<String>,
}

impl IncomingMessage {
    pub fn reply_text(&self) -> String {
        match self.text.as_deref() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => NON_TEXT_PLACEHOLDER.to_string(),
        }
    }
}

/// Correlates replies with the message just sent.
///
/// Only messages newer than `last_message_id` in `target` count as replies;
/// the handle advances as replies are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationHandle {
    pub target: ChatId,
    pub last_message_id: i64,
}

impl ConversationHandle {
    pub fn open(sent: &SentMessage) -> Self {
        Self {
            target: sent.chat_id,
            last_message_id: sent.message_id,
        }
    }

    pub fn accepts(&self, message: &IncomingMessage) -> bool {
        message.chat_id == self.target && message.message_id > self.last_message_id
    }

    pub fn observe(&mut self, message: &IncomingMessage) {
        if message.message_id > self.last_message_id {
            self.last_message_id = message.message_id;
        }
    }
}
