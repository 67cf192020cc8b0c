//! Notifier port - 外部への通知 (fire and forget)
//!
//! 通知の失敗はバッチにも終了コードにも影響しません。

use async_trait::async_trait;

/// Outbound side channel for a human-readable summary.
///
/// `notify` must return immediately; delivery happens in the background.
/// `flush` waits for deliveries still in flight, bounded by the
/// implementation's own timeout, so they survive process shutdown.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn notify(&self, message: String);

    async fn flush(&self) {}
}
