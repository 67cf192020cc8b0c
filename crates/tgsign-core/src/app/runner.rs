//! BatchRunner - バッチ全体の逐次実行
//!
//! セッションを 1 回だけ確立し、タスクを設定順に 1 つずつ実行します。
//! 致命的なのはセッション確立の失敗だけで、個々のタスクの失敗は
//! レポートされた上で次のタスクへ進みます。

use std::sync::Arc;

use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::domain::{BatchState, Execution, RunId, SessionError, SignTask, TaskOutcome};
use crate::ports::{ChatClient, Clock, IdGenerator, Notifier, ReportSink, TaskPosition};

use super::collector::ReplyWindow;
use super::executor::TaskExecutor;
use super::report::render_summary;

/// Counters for one run. No task content is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub run_id: RunId,
    pub total: usize,
    pub completed: usize,
    pub rate_limited: usize,
    pub failed: usize,
    pub skipped: usize,
    pub final_state: BatchState,
}

impl BatchSummary {
    pub fn new(run_id: RunId, total: usize) -> Self {
        Self {
            run_id,
            total,
            completed: 0,
            rate_limited: 0,
            failed: 0,
            skipped: 0,
            final_state: BatchState::Idle,
        }
    }

    pub fn record(&mut self, execution: &Execution) {
        match execution {
            Execution::Skipped { .. } => self.skipped += 1,
            Execution::Finished(result) => match result.outcome {
                TaskOutcome::Completed => self.completed += 1,
                TaskOutcome::RateLimited { .. } => self.rate_limited += 1,
                TaskOutcome::Failed { .. } => self.failed += 1,
            },
        }
    }

    /// Number of tasks that produced a result or a skip marker.
    pub fn reported(&self) -> usize {
        self.completed + self.rate_limited + self.failed + self.skipped
    }
}

/// Owns the chat session for the lifetime of a batch.
///
/// Built through [`RunnerBuilder`](super::builder::RunnerBuilder).
pub struct BatchRunner {
    pub(super) client: Arc<dyn ChatClient>,
    pub(super) sink: Arc<dyn ReportSink>,
    pub(super) notifier: Option<Arc<dyn Notifier>>,
    pub(super) window: ReplyWindow,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) ids: Arc<dyn IdGenerator>,
}

impl BatchRunner {
    /// Run every task in order.
    ///
    /// Returns `Err` only when the session cannot be established; in that case
    /// no task runs.
    pub async fn run(&self, tasks: &[SignTask]) -> Result<BatchSummary, SessionError> {
        let run_id = self.ids.generate_run_id();
        let span = info_span!("batch", %run_id, tasks = tasks.len());
        self.run_batch(run_id, tasks).instrument(span).await
    }

    async fn run_batch(
        &self,
        run_id: RunId,
        tasks: &[SignTask],
    ) -> Result<BatchSummary, SessionError> {
        let mut state = BatchState::Idle;
        advance(&mut state, BatchState::SessionEstablishing);

        let account = match self.client.connect().await {
            Ok(account) => account,
            Err(err) => {
                advance(&mut state, BatchState::Aborted);
                let err = SessionError::from(err);
                error!(error = %err, "aborting batch");
                self.sink.batch_aborted(&err.to_string());
                self.notify(format!("Sign batch {run_id} aborted: {err}"))
                    .await;
                return Err(err);
            }
        };
        info!(
            account_id = account.id,
            name = %account.first_name,
            "session established"
        );

        // キャッシュのウォームアップ失敗は致命的ではない
        match self.client.sync_dialogs().await {
            Ok(count) => debug!(count, "dialogs synchronized"),
            Err(err) => warn!(error = %err, "dialog sync failed, continuing"),
        }

        let executor = TaskExecutor::new(
            self.client.as_ref(),
            self.window,
            self.clock.as_ref(),
            self.ids.as_ref(),
        );
        let total = tasks.len();
        let mut summary = BatchSummary::new(run_id, total);

        for (index, task) in tasks.iter().enumerate() {
            advance(&mut state, BatchState::Running(index));

            let position = TaskPosition {
                number: index + 1,
                total,
            };
            let span = info_span!("task", index = position.number, chat_id = %task.chat_id());
            let execution = executor.execute(task).instrument(span).await;

            summary.record(&execution);
            self.sink.report(position, task.chat_id(), &execution);
        }

        advance(&mut state, BatchState::Done);
        summary.final_state = state;

        info!(
            completed = summary.completed,
            rate_limited = summary.rate_limited,
            failed = summary.failed,
            skipped = summary.skipped,
            "all tasks finished"
        );
        self.sink.batch_finished(&summary);
        self.notify(render_summary(&summary)).await;

        Ok(summary)
    }

    /// Hand `message` to the notifier and wait for it to leave the process.
    async fn notify(&self, message: String) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(message);
            notifier.flush().await;
        }
    }
}

fn advance(state: &mut BatchState, next: BatchState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid batch transition {state:?} -> {next:?}"
    );
    *state = next;
}
