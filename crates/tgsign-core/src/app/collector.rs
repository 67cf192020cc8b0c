//! Reply collection window.
//!
//! Two independent timers bound the window:
//! - idle: restarts on every reply; silence for this long ends collection.
//! - ceiling: started once when collection begins; ends collection even mid-burst.
//!
//! Whichever fires first wins. Neither is an error.

use std::time::Duration;

use tracing::debug;

use crate::domain::{ChatError, ConversationHandle};
use crate::ports::ChatClient;

/// Timing of the reply window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyWindow {
    pub idle: Duration,
    pub ceiling: Duration,
}

impl ReplyWindow {
    pub const DEFAULT_IDLE: Duration = Duration::from_secs(5);
    pub const DEFAULT_CEILING: Duration = Duration::from_secs(10);

    pub fn new(idle: Duration, ceiling: Duration) -> Self {
        Self { idle, ceiling }
    }
}

impl Default for ReplyWindow {
    fn default() -> Self {
        Self::new(Self::DEFAULT_IDLE, Self::DEFAULT_CEILING)
    }
}

/// Which timer closed the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    /// The other side went quiet for `idle`.
    Quiet,
    /// The hard ceiling fired.
    Ceiling,
}

/// Collect replies into `replies` until one of the timers fires.
///
/// Replies are appended as they arrive, so whatever was gathered before an
/// adapter error is still in `replies` when the error is returned.
pub async fn collect_replies(
    client: &dyn ChatClient,
    mut conversation: ConversationHandle,
    window: ReplyWindow,
    replies: &mut Vec<String>,
) -> Result<WindowEnd, ChatError> {
    let ceiling = tokio::time::sleep(window.ceiling);
    tokio::pin!(ceiling);

    loop {
        tokio::select! {
            // 同時に発火した場合は ceiling を優先
            biased;

            _ = &mut ceiling => {
                debug!(collected = replies.len(), "reply ceiling reached");
                return Ok(WindowEnd::Ceiling);
            }
            next = tokio::time::timeout(
                window.idle,
                client.await_next_message(&conversation, window.idle),
            ) => match next {
                Err(_) | Ok(Ok(None)) => {
                    debug!(collected = replies.len(), "conversation went quiet");
                    return Ok(WindowEnd::Quiet);
                }
                Ok(Ok(Some(message))) => {
                    conversation.observe(&message);
                    replies.push(message.reply_text());
                }
                Ok(Err(err)) => return Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, NON_TEXT_PLACEHOLDER};
    use crate::impls::{ChatScript, ScriptedChatClient};
    use tokio::time::Instant;

    const CHAT: i64 = 100;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    async fn send_and_collect(client: &ScriptedChatClient) -> (Vec<String>, WindowEnd, Duration) {
        let sent = client
            .send_text(ChatId::new(CHAT), "/checkin", None)
            .await
            .unwrap();
        let start = Instant::now();
        let mut replies = Vec::new();
        let end = collect_replies(
            client,
            ConversationHandle::open(&sent),
            ReplyWindow::default(),
            &mut replies,
        )
        .await
        .unwrap();
        (replies, end, start.elapsed())
    }

    #[tokio::test(start_paused = true)]
    async fn burst_then_silence_collects_every_reply() {
        let client = ScriptedChatClient::new()
            .with_chat(ChatScript::new(CHAT).replies_at([secs(1), secs(3), secs(4)]));

        let (replies, end, elapsed) = send_and_collect(&client).await;

        assert_eq!(replies, vec!["reply 1", "reply 2", "reply 3"]);
        assert_eq!(end, WindowEnd::Quiet);
        // last reply at 4s + 5s idle
        assert_eq!(elapsed, secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn hard_ceiling_stops_a_chatty_counterpart() {
        let client =
            ScriptedChatClient::new().with_chat(ChatScript::new(CHAT).replies_every(secs(2)));

        let (replies, end, elapsed) = send_and_collect(&client).await;

        assert_eq!(end, WindowEnd::Ceiling);
        assert_eq!(elapsed, secs(10));
        assert_eq!(replies.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn no_reply_is_a_quiet_window() {
        let client = ScriptedChatClient::new().with_chat(ChatScript::new(CHAT));

        let (replies, end, elapsed) = send_and_collect(&client).await;

        assert!(replies.is_empty());
        assert_eq!(end, WindowEnd::Quiet);
        assert_eq!(elapsed, secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timer_restarts_after_each_reply() {
        // gaps of 4s never reach the 5s idle timeout, so only the ceiling stops this
        let client = ScriptedChatClient::new()
            .with_chat(ChatScript::new(CHAT).replies_at([secs(4), secs(8)]));

        let (replies, end, _) = send_and_collect(&client).await;

        assert_eq!(replies.len(), 2);
        assert_eq!(end, WindowEnd::Ceiling);
    }

    #[tokio::test(start_paused = true)]
    async fn non_text_reply_gets_placeholder() {
        let client =
            ScriptedChatClient::new().with_chat(ChatScript::new(CHAT).reply_with(secs(1), None));

        let (replies, _, _) = send_and_collect(&client).await;

        assert_eq!(replies, vec![NON_TEXT_PLACEHOLDER.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn adapter_error_keeps_partial_replies() {
        let client = ScriptedChatClient::new().with_chat(
            ChatScript::new(CHAT)
                .replies_at([secs(1)])
                .fail_receive_after(1, ChatError::FloodWait { seconds: 12 }),
        );
        let sent = client.send_text(ChatId::new(CHAT), "hi", None).await.unwrap();

        let mut replies = Vec::new();
        let err = collect_replies(
            &client,
            ConversationHandle::open(&sent),
            ReplyWindow::default(),
            &mut replies,
        )
        .await
        .unwrap_err();

        assert_eq!(err.flood_wait_secs(), Some(12));
        assert_eq!(replies, vec!["reply 1"]);
    }
}
