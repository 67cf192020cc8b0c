//! BotApiNotifier - バッチ終了サマリーを Telegram に送る Notifier
//!
//! 送信は spawn したタスクで行い、結果はログに残すだけです。
//! ハンドルは保持しておき、`flush` で HTTP タイムアウトまで待ちます。

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::ChatId;
use crate::ports::Notifier;

use super::bot_api::BotApiConfig;

pub struct BotApiNotifier {
    http: reqwest::Client,
    url: String,
    chat_id: ChatId,
    timeout: Duration,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl BotApiNotifier {
    pub fn new(config: &BotApiConfig, chat_id: ChatId, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: config.method_url("sendMessage"),
            chat_id,
            timeout,
            in_flight: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Notifier for BotApiNotifier {
    /// Requires a running tokio runtime.
    fn notify(&self, message: String) {
        let request = self.http.post(&self.url).json(&json!({
            "chat_id": self.chat_id,
            "text": message,
            "disable_web_page_preview": true,
        }));

        let handle = tokio::spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    info!("summary notification sent");
                }
                Ok(response) => {
                    warn!(status = %response.status(), "summary notification rejected");
                }
                Err(err) => {
                    warn!(error = %err.without_url(), "summary notification failed");
                }
            }
        });
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Waits at most the HTTP timeout for all pending sends.
    async fn flush(&self) {
        let pending = std::mem::take(
            &mut *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if pending.is_empty() {
            return;
        }

        let drain = async {
            for handle in pending {
                if let Err(err) = handle.await {
                    warn!(error = %err, "summary notification task ended abnormally");
                }
            }
        };
        if tokio::time::timeout(self.timeout, drain).await.is_err() {
            warn!(timeout_secs = self.timeout.as_secs(), "summary notification still pending, giving up");
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn mount_send_message(server: &MockServer) -> Mock {
        Mock::given(method("POST"))
            .and(path("/bot1:x/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": 99,
                "text": "Sign batch finished",
                "disable_web_page_preview": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })))
            .expect(1)
    }

    // main と同じく、run の直後にランタイムを破棄する
    #[tokio::test(flavor = "multi_thread")]
    async fn flushed_notification_outlives_its_runtime() {
        let server = MockServer::start().await;
        mount_send_message(&server).mount(&server).await;
        let config = BotApiConfig::new("1:x").with_base_url(server.uri());

        tokio::task::spawn_blocking(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let notifier =
                    BotApiNotifier::new(&config, ChatId::new(99), Duration::from_secs(5)).unwrap();
                notifier.notify("Sign batch finished".to_string());
                notifier.flush().await;
            });
        })
        .await
        .unwrap();

        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn flush_gives_up_after_the_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;
        let config = BotApiConfig::new("1:x").with_base_url(server.uri());
        let notifier =
            BotApiNotifier::new(&config, ChatId::new(99), Duration::from_millis(200)).unwrap();

        notifier.notify("Sign batch finished".to_string());
        let started = std::time::Instant::now();
        notifier.flush().await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(notifier.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn flush_without_pending_sends_returns_immediately() {
        let config = BotApiConfig::new("1:x").with_base_url("http://127.0.0.1:9");
        let notifier =
            BotApiNotifier::new(&config, ChatId::new(99), Duration::from_secs(5)).unwrap();

        notifier.flush().await;
    }
}
