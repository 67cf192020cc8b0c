//! ChatClient port - チャットプラットフォームへの接続
//!
//! Executor と runner はこの trait だけに依存します。
//!
//! # 実装
//! - `impls::BotApiClient`: Telegram Bot API (HTTPS)
//! - `impls::ScriptedChatClient`: テスト用のスクリプト駆動クライアント

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{
    Account, ChatEntity, ChatError, ChatId, ConversationHandle, IncomingMessage, ParseMode,
    SentMessage,
};

/// One logged-in chat session.
///
/// The runner owns the session for the whole batch and lends it to one
/// executor at a time, so implementations never see concurrent conversations.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Authenticate and return the logged-in account.
    async fn connect(&self) -> Result<Account, ChatError>;

    /// Warm whatever client-side state target resolution and reply
    /// correlation rely on. Returns how many stale entries were discarded.
    async fn sync_dialogs(&self) -> Result<usize, ChatError>;

    async fn resolve_target(&self, chat_id: ChatId) -> Result<ChatEntity, ChatError>;

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<SentMessage, ChatError>;

    async fn send_file(
        &self,
        chat_id: ChatId,
        file: &str,
        caption: Option<&str>,
    ) -> Result<SentMessage, ChatError>;

    /// Wait up to `timeout` for the next message the conversation accepts.
    ///
    /// `Ok(None)` means nothing arrived in time; it is not an error.
    async fn await_next_message(
        &self,
        conversation: &ConversationHandle,
        timeout: Duration,
    ) -> Result<Option<IncomingMessage>, ChatError>;
}
