//! LogReportSink - レポートを tracing に出力する本番用 ReportSink

use tracing::{error, info};

use crate::app::{BatchSummary, render_summary, render_task_report};
use crate::domain::{ChatId, Execution};
use crate::ports::{ReportSink, TaskPosition};

/// Writes every rendered block at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn report(&self, position: TaskPosition, chat_id: ChatId, execution: &Execution) {
        info!("{}", render_task_report(position, chat_id, execution));
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        info!(run_id = %summary.run_id, "🏁 {}", render_summary(summary));
    }

    fn batch_aborted(&self, reason: &str) {
        error!("🛑 Sign batch aborted: {reason}");
    }
}
