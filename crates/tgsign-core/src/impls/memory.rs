//! MemoryReportSink / MemoryNotifier - 記録するだけの実装（テスト用）
//!
//! # 学習ポイント
//! - 同期 trait の実装で `std::sync::Mutex` を使う（await を跨がない）

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::app::BatchSummary;
use crate::domain::{ChatId, Execution};
use crate::ports::{Notifier, ReportSink, TaskPosition};

/// One call to `ReportSink::report`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedReport {
    pub position: TaskPosition,
    pub chat_id: ChatId,
    pub execution: Execution,
}

#[derive(Default)]
struct SinkState {
    reports: Vec<RecordedReport>,
    finished: Option<BatchSummary>,
    aborted: Option<String>,
}

/// MemoryReportSink は受け取ったレポートを保持
#[derive(Default)]
pub struct MemoryReportSink {
    state: Mutex<SinkState>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn reports(&self) -> Vec<RecordedReport> {
        self.lock().reports.clone()
    }

    pub fn finished(&self) -> Option<BatchSummary> {
        self.lock().finished.clone()
    }

    pub fn aborted(&self) -> Option<String> {
        self.lock().aborted.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SinkState> {
        self.state.lock().expect("report sink state poisoned")
    }
}

impl ReportSink for MemoryReportSink {
    fn report(&self, position: TaskPosition, chat_id: ChatId, execution: &Execution) {
        self.lock().reports.push(RecordedReport {
            position,
            chat_id,
            execution: execution.clone(),
        });
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        self.lock().finished = Some(summary.clone());
    }

    fn batch_aborted(&self, reason: &str) {
        self.lock().aborted = Some(reason.to_string());
    }
}

/// MemoryNotifier は通知メッセージを保持
#[derive(Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<String>>,
    flushes: AtomicUsize,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .expect("notifier state poisoned")
            .clone()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    fn notify(&self, message: String) {
        self.messages
            .lock()
            .expect("notifier state poisoned")
            .push(message);
    }

    async fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}
