//! RunnerBuilder - BatchRunner の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 省略時のデフォルト（ログ出力の ReportSink、システム時刻、ULID）

use std::sync::Arc;
use std::time::Duration;

use crate::impls::LogReportSink;
use crate::ports::{ChatClient, Clock, IdGenerator, Notifier, ReportSink, SystemClock, UlidGenerator};

use super::collector::ReplyWindow;
use super::runner::BatchRunner;

/// RunnerBuilder は BatchRunner を構築
///
/// # 使用例
/// ```ignore
/// let runner = RunnerBuilder::new(Arc::new(client))
///     .notifier(Arc::new(notifier))
///     .reply_window(ReplyWindow::new(idle, ceiling))
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - build() 時にタイマー設定を検証
/// - 0 秒の idle / ceiling は BuildError を返す
pub struct RunnerBuilder {
    client: Arc<dyn ChatClient>,
    sink: Option<Arc<dyn ReportSink>>,
    notifier: Option<Arc<dyn Notifier>>,
    window: ReplyWindow,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はランナー構築時のエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("reply idle timeout must be greater than zero")]
    ZeroIdleTimeout,

    #[error("reply ceiling must be greater than zero")]
    ZeroCeiling,
}

impl RunnerBuilder {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self {
            client,
            sink: None,
            notifier: None,
            window: ReplyWindow::default(),
            clock: None,
            ids: None,
        }
    }

    /// 省略時は `LogReportSink`
    pub fn report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn reply_window(mut self, window: ReplyWindow) -> Self {
        self.window = window;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// # 検証
    /// - idle / ceiling が 0 でないこと
    pub fn build(self) -> Result<BatchRunner, BuildError> {
        if self.window.idle == Duration::ZERO {
            return Err(BuildError::ZeroIdleTimeout);
        }
        if self.window.ceiling == Duration::ZERO {
            return Err(BuildError::ZeroCeiling);
        }

        Ok(BatchRunner {
            client: self.client,
            sink: self
                .sink
                .unwrap_or_else(|| Arc::new(LogReportSink) as Arc<dyn ReportSink>),
            notifier: self.notifier,
            window: self.window,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>),
            ids: self
                .ids
                .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)) as Arc<dyn IdGenerator>),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::ScriptedChatClient;

    fn builder() -> RunnerBuilder {
        RunnerBuilder::new(Arc::new(ScriptedChatClient::new()))
    }

    #[test]
    fn test_build_with_defaults() {
        let runner = builder().build().unwrap();
        assert_eq!(runner.window, ReplyWindow::default());
        assert!(runner.notifier.is_none());
    }

    #[test]
    fn test_build_zero_idle() {
        let result = builder()
            .reply_window(ReplyWindow::new(Duration::ZERO, Duration::from_secs(10)))
            .build();
        assert!(matches!(result, Err(BuildError::ZeroIdleTimeout)));
    }

    #[test]
    fn test_build_zero_ceiling() {
        let result = builder()
            .reply_window(ReplyWindow::new(Duration::from_secs(5), Duration::ZERO))
            .build();
        assert!(matches!(result, Err(BuildError::ZeroCeiling)));
    }

    #[test]
    fn test_ceiling_may_be_shorter_than_idle() {
        let result = builder()
            .reply_window(ReplyWindow::new(Duration::from_secs(10), Duration::from_secs(3)))
            .build();
        assert!(result.is_ok());
    }
}
