//! TaskExecutor - 1 タスクの実行
//!
//! delay → resolve → send → collect の順に進み、どの失敗も
//! `TaskOutcome` に分類して返します。呼び出し元にエラーは伝播しません。

use tracing::{debug, info, warn};

use crate::domain::{
    ChatEntity, ChatError, ConversationHandle, Execution, SentMessage, SignTask,
    SkipReason, TaskOutcome, TaskPayload, TaskResult,
};
use crate::ports::{ChatClient, Clock, IdGenerator};

use super::collector::{ReplyWindow, WindowEnd, collect_replies};

/// Runs one task against a shared chat session.
///
/// Borrowed per batch from the runner; owns nothing.
pub struct TaskExecutor<'a> {
    client: &'a dyn ChatClient,
    window: ReplyWindow,
    clock: &'a dyn Clock,
    ids: &'a dyn IdGenerator,
}

impl<'a> TaskExecutor<'a> {
    pub fn new(
        client: &'a dyn ChatClient,
        window: ReplyWindow,
        clock: &'a dyn Clock,
        ids: &'a dyn IdGenerator,
    ) -> Self {
        Self {
            client,
            window,
            clock,
            ids,
        }
    }

    /// Execute `task` and classify whatever happens.
    ///
    /// A zero chat id yields `Execution::Skipped` without touching the client.
    pub async fn execute(&self, task: &SignTask) -> Execution {
        let chat_id = task.chat_id();
        if chat_id.is_unset() {
            warn!("task has no chat_id, skipping");
            return Execution::Skipped {
                reason: SkipReason::MissingChatId,
            };
        }

        let execution_id = self.ids.generate_execution_id();
        let started_at = self.clock.now();

        if !task.delay().is_zero() {
            info!(delay_secs = task.delay().as_secs(), "waiting before send");
            tokio::time::sleep(task.delay()).await;
        }

        // 解決失敗は致命的ではない: フォールバック名で続行
        let target_name = match self.client.resolve_target(chat_id).await {
            Ok(entity) => entity.display_name(),
            Err(err) => {
                warn!(error = %err, "could not resolve target, using fallback name");
                ChatEntity::fallback_name(chat_id)
            }
        };

        let mut replies = Vec::new();
        let outcome = match self.send_and_collect(task, &mut replies).await {
            Ok(end) => {
                debug!(?end, replies = replies.len(), "reply window closed");
                TaskOutcome::Completed
            }
            Err(err) => {
                let outcome = classify(&err);
                match &outcome {
                    TaskOutcome::RateLimited { wait_secs } => {
                        warn!(wait_secs, "flood control hit, abandoning task")
                    }
                    _ => warn!(error = %err, "task failed"),
                }
                outcome
            }
        };

        Execution::Finished(TaskResult {
            execution_id,
            target_name,
            chat_id,
            sent_summary: task.payload().summary(),
            replies,
            outcome,
            started_at,
            finished_at: self.clock.now(),
        })
    }

    async fn send_and_collect(
        &self,
        task: &SignTask,
        replies: &mut Vec<String>,
    ) -> Result<WindowEnd, ChatError> {
        let sent = self.send(task).await?;
        debug!(message_id = sent.message_id, "payload sent");
        collect_replies(
            self.client,
            ConversationHandle::open(&sent),
            self.window,
            replies,
        )
        .await
    }

    async fn send(&self, task: &SignTask) -> Result<SentMessage, ChatError> {
        let chat_id = task.chat_id();
        let payload = task.payload();
        match payload {
            TaskPayload::Text(text) | TaskPayload::Markdown(text) | TaskPayload::Html(text) => {
                self.client
                    .send_text(chat_id, text, payload.parse_mode())
                    .await
            }
            TaskPayload::File { path, caption } => {
                self.client
                    .send_file(chat_id, path, caption.as_deref())
                    .await
            }
        }
    }
}

/// Flood control becomes `RateLimited`; everything else is `Failed`.
pub fn classify(err: &ChatError) -> TaskOutcome {
    match err.flood_wait_secs() {
        Some(wait_secs) => TaskOutcome::RateLimited { wait_secs },
        None => TaskOutcome::Failed {
            reason: err.to_string(),
        },
    }
}
