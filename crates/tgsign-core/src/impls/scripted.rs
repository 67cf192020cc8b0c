//! ScriptedChatClient - スクリプト駆動のチャットクライアント（テスト用）
//!
//! 各チャットの振る舞い（表示名、送信失敗、返信のタイミング）を事前に決めておき、
//! tokio の仮想時間と組み合わせてタイミングを決定的に検証します。
//!
//! Reply offsets are measured from the moment the last message was sent to
//! that chat.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::{
    Account, ChatEntity, ChatError, ChatId, ConversationHandle, IncomingMessage, ParseMode,
    SentMessage,
};
use crate::ports::ChatClient;

/// How one chat behaves.
pub struct ChatScript {
    chat_id: ChatId,
    name: Option<String>,
    resolvable: bool,
    send_error: Option<ChatError>,
    replies: ReplyPlan,
    receive_error: Option<(usize, ChatError)>,
}

enum ReplyPlan {
    /// Fixed arrivals: offset after send, reply text.
    Burst(Vec<(Duration, Option<String>)>),
    /// One reply every `Duration`, forever.
    Every(Duration),
}

impl ChatScript {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id: ChatId::new(chat_id),
            name: None,
            resolvable: true,
            send_error: None,
            replies: ReplyPlan::Burst(Vec::new()),
            receive_error: None,
        }
    }

    pub fn named(mut self, title: impl Into<String>) -> Self {
        self.name = Some(title.into());
        self
    }

    /// `resolve_target` fails with `NotFound` for this chat.
    pub fn unresolvable(mut self) -> Self {
        self.resolvable = false;
        self
    }

    /// The next send to this chat fails with `error`.
    pub fn send_error(mut self, error: ChatError) -> Self {
        self.send_error = Some(error);
        self
    }

    /// Text replies "reply 1", "reply 2", ... at the given offsets.
    pub fn replies_at(mut self, offsets: impl IntoIterator<Item = Duration>) -> Self {
        let planned = self.burst_mut();
        for offset in offsets {
            let text = format!("reply {}", planned.len() + 1);
            planned.push((offset, Some(text)));
        }
        self
    }

    /// A single reply at `offset`; `None` stands for non-text content.
    pub fn reply_with(mut self, offset: Duration, text: Option<&str>) -> Self {
        self.burst_mut().push((offset, text.map(str::to_string)));
        self
    }

    pub fn replies_every(mut self, period: Duration) -> Self {
        self.replies = ReplyPlan::Every(period);
        self
    }

    /// After `delivered` replies, the next receive fails with `error`.
    pub fn fail_receive_after(mut self, delivered: usize, error: ChatError) -> Self {
        self.receive_error = Some((delivered, error));
        self
    }

    fn burst_mut(&mut self) -> &mut Vec<(Duration, Option<String>)> {
        if let ReplyPlan::Every(_) = self.replies {
            self.replies = ReplyPlan::Burst(Vec::new());
        }
        match &mut self.replies {
            ReplyPlan::Burst(planned) => planned,
            ReplyPlan::Every(_) => unreachable!("replaced above"),
        }
    }

    fn next_reply(&self, delivered: usize) -> Option<(Duration, Option<String>)> {
        match &self.replies {
            ReplyPlan::Burst(planned) => planned.get(delivered).cloned(),
            ReplyPlan::Every(period) => {
                let n = delivered as u32 + 1;
                Some((*period * n, Some(format!("reply {n}"))))
            }
        }
    }
}

/// A message the client was asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub chat_id: ChatId,
    pub content: String,
    pub parse_mode: Option<ParseMode>,
    pub caption: Option<String>,
    pub at: Instant,
}

struct ChatState {
    script: ChatScript,
    sent_at: Option<Instant>,
    delivered: usize,
}

struct State {
    chats: HashMap<ChatId, ChatState>,
    sent: Vec<SentRecord>,
    resolved: Vec<ChatId>,
    next_message_id: i64,
    dialogs_synced: bool,
}

/// In-memory `ChatClient` that plays back per-chat scripts.
///
/// Chats without a script resolve to `NotFound`, accept sends and never reply.
pub struct ScriptedChatClient {
    account: Option<Account>,
    state: Mutex<State>,
}

impl ScriptedChatClient {
    pub fn new() -> Self {
        Self {
            account: Some(Account {
                id: 1,
                first_name: "Tester".to_string(),
                username: None,
            }),
            state: Mutex::new(State {
                chats: HashMap::new(),
                sent: Vec::new(),
                resolved: Vec::new(),
                next_message_id: 1,
                dialogs_synced: false,
            }),
        }
    }

    /// A client whose `connect` always fails with `Unauthorized`.
    pub fn rejecting_login() -> Self {
        Self {
            account: None,
            ..Self::new()
        }
    }

    pub fn with_chat(self, script: ChatScript) -> Self {
        self.lock().chats.insert(
            script.chat_id,
            ChatState {
                script,
                sent_at: None,
                delivered: 0,
            },
        );
        self
    }

    /// Everything sent so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<SentRecord> {
        self.lock().sent.clone()
    }

    /// Chats passed to `resolve_target`, in order.
    pub fn resolved(&self) -> Vec<ChatId> {
        self.lock().resolved.clone()
    }

    pub fn dialogs_synced(&self) -> bool {
        self.lock().dialogs_synced
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("scripted client state poisoned")
    }

    fn record_send(
        &self,
        chat_id: ChatId,
        content: &str,
        parse_mode: Option<ParseMode>,
        caption: Option<&str>,
    ) -> Result<SentMessage, ChatError> {
        let mut state = self.lock();
        let now = Instant::now();
        state.sent.push(SentRecord {
            chat_id,
            content: content.to_string(),
            parse_mode,
            caption: caption.map(str::to_string),
            at: now,
        });

        if let Some(chat) = state.chats.get_mut(&chat_id) {
            if let Some(err) = chat.script.send_error.take() {
                return Err(err);
            }
            chat.sent_at = Some(now);
            chat.delivered = 0;
        }

        let message_id = state.next_message_id;
        state.next_message_id += 1;
        Ok(SentMessage {
            chat_id,
            message_id,
        })
    }
}

impl Default for ScriptedChatClient {
    fn default() -> Self {
        Self::new()
    }
}

enum Next {
    Fail(ChatError),
    At(Instant),
    Nothing,
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn connect(&self) -> Result<Account, ChatError> {
        self.account
            .clone()
            .ok_or_else(|| ChatError::Unauthorized("scripted login rejected".to_string()))
    }

    async fn sync_dialogs(&self) -> Result<usize, ChatError> {
        let mut state = self.lock();
        state.dialogs_synced = true;
        Ok(state.chats.len())
    }

    async fn resolve_target(&self, chat_id: ChatId) -> Result<ChatEntity, ChatError> {
        let mut state = self.lock();
        state.resolved.push(chat_id);
        match state.chats.get(&chat_id) {
            Some(chat) if chat.script.resolvable => Ok(ChatEntity {
                id: chat_id,
                title: chat.script.name.clone(),
                ..ChatEntity::default()
            }),
            _ => Err(ChatError::NotFound(format!("chat {chat_id}"))),
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<SentMessage, ChatError> {
        self.record_send(chat_id, text, parse_mode, None)
    }

    async fn send_file(
        &self,
        chat_id: ChatId,
        file: &str,
        caption: Option<&str>,
    ) -> Result<SentMessage, ChatError> {
        self.record_send(chat_id, file, None, caption)
    }

    async fn await_next_message(
        &self,
        conversation: &ConversationHandle,
        timeout: Duration,
    ) -> Result<Option<IncomingMessage>, ChatError> {
        let deadline = Instant::now() + timeout;

        // ロックは await を跨がない
        let next = {
            let mut state = self.lock();
            match state.chats.get_mut(&conversation.target) {
                Some(chat) => match chat.script.receive_error.take() {
                    Some((after, err)) if chat.delivered >= after => Next::Fail(err),
                    pending => {
                        chat.script.receive_error = pending;
                        let sent_at = chat.sent_at.unwrap_or_else(Instant::now);
                        match chat.script.next_reply(chat.delivered) {
                            Some((offset, _)) => Next::At(sent_at + offset),
                            None => Next::Nothing,
                        }
                    }
                },
                None => Next::Nothing,
            }
        };

        let due = match next {
            Next::Fail(err) => return Err(err),
            Next::At(due) if due <= deadline => due,
            Next::At(_) | Next::Nothing => {
                tokio::time::sleep_until(deadline).await;
                return Ok(None);
            }
        };

        tokio::time::sleep_until(due).await;

        let mut state = self.lock();
        let message_id = conversation.last_message_id + 1;
        state.next_message_id = state.next_message_id.max(message_id + 1);
        let Some(chat) = state.chats.get_mut(&conversation.target) else {
            return Ok(None);
        };
        let text = chat
            .script
            .next_reply(chat.delivered)
            .and_then(|(_, text)| text);
        chat.delivered += 1;

        Ok(Some(IncomingMessage {
            chat_id: conversation.target,
            message_id,
            text,
        }))
    }
}
