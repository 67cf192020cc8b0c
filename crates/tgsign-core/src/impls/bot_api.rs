//! BotApiClient - Telegram Bot API 上の ChatClient 実装
//!
//! # 学習ポイント
//! - reqwest による JSON / multipart の API 呼び出し
//! - `ok=false` エンベロープから `ChatError` への分類
//! - getUpdates の long-poll と offset 管理
//!
//! Bot API には「会話」の概念がないので、getUpdates で受け取ったメッセージを
//! チャット ID と message_id で送信済みメッセージに対応付けます。

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::domain::{
    Account, ChatEntity, ChatError, ChatId, ConversationHandle, IncomingMessage, ParseMode,
    SentMessage,
};
use crate::ports::ChatClient;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Bot API.
#[derive(Clone)]
pub struct BotApiConfig {
    token: String,
    base_url: String,
    http_timeout: Duration,
}

impl BotApiConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub(crate) fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.base_url.trim_end_matches('/'),
            self.token
        )
    }
}

// Debug は token を出さない
impl std::fmt::Debug for BotApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotApiConfig")
            .field("base_url", &self.base_url)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}

/// Update cursor shared by all receive calls.
#[derive(Default)]
struct UpdateCursor {
    offset: Option<i64>,
    pending: VecDeque<IncomingMessage>,
}

pub struct BotApiClient {
    config: BotApiConfig,
    http: reqwest::Client,
    updates: Mutex<UpdateCursor>,
}

impl BotApiClient {
    pub fn new(config: BotApiConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(network)?;
        Ok(Self {
            config,
            http,
            updates: Mutex::new(UpdateCursor::default()),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, ChatError> {
        let response = self
            .http
            .post(self.config.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }

    async fn poll_updates(&self, offset: Option<i64>, poll_secs: u64) -> Result<Vec<Update>, ChatError> {
        let mut body = json!({
            "timeout": poll_secs,
            "allowed_updates": ["message", "channel_post"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        let response = self
            .http
            .post(self.config.method_url("getUpdates"))
            // long-poll 分だけ HTTP タイムアウトを延長
            .timeout(self.config.http_timeout + Duration::from_secs(poll_secs))
            .json(&body)
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }

    async fn upload_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<Message, ChatError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name));
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .http
            .post(self.config.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }
}

#[async_trait]
impl ChatClient for BotApiClient {
    async fn connect(&self) -> Result<Account, ChatError> {
        let me: User = self.call("getMe", &json!({})).await?;
        info!(account_id = me.id, name = %me.first_name, "logged in to Bot API");
        Ok(Account {
            id: me.id,
            first_name: me.first_name,
            username: me.username,
        })
    }

    /// Skip the update backlog so that old messages are never taken as replies.
    async fn sync_dialogs(&self) -> Result<usize, ChatError> {
        let mut cursor = self.updates.lock().await;
        let backlog: Vec<Update> = self
            .call("getUpdates", &json!({ "offset": -1, "timeout": 0 }))
            .await?;
        if let Some(last) = backlog.last() {
            cursor.offset = Some(last.update_id + 1);
        }
        cursor.pending.clear();
        debug!(offset = ?cursor.offset, "update backlog skipped");
        Ok(backlog.len())
    }

    async fn resolve_target(&self, chat_id: ChatId) -> Result<ChatEntity, ChatError> {
        let chat: ApiChat = self.call("getChat", &json!({ "chat_id": chat_id })).await?;
        Ok(chat.into())
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<SentMessage, ChatError> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = json!(mode.as_api_str());
        }
        let message: Message = self.call("sendMessage", &body).await?;
        Ok(message.sent())
    }

    /// Local files are uploaded; anything else is passed through as a URL or file id.
    async fn send_file(
        &self,
        chat_id: ChatId,
        file: &str,
        caption: Option<&str>,
    ) -> Result<SentMessage, ChatError> {
        let path = Path::new(file);
        let is_local = tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);

        let message = if is_local {
            self.upload_document(chat_id, path, caption).await?
        } else {
            let mut body = json!({ "chat_id": chat_id, "document": file });
            if let Some(caption) = caption {
                body["caption"] = json!(caption);
            }
            self.call("sendDocument", &body).await?
        };
        Ok(message.sent())
    }

    async fn await_next_message(
        &self,
        conversation: &ConversationHandle,
        timeout: Duration,
    ) -> Result<Option<IncomingMessage>, ChatError> {
        let deadline = Instant::now() + timeout;
        let mut cursor = self.updates.lock().await;

        loop {
            if let Some(index) = cursor.pending.iter().position(|m| conversation.accepts(m)) {
                return Ok(cursor.pending.remove(index));
            }
            cursor.pending.clear();

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            // 秒単位に切り上げ。超過分は呼び出し側のタイマーが打ち切る
            let poll_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);

            let updates = self.poll_updates(cursor.offset, poll_secs).await?;
            for update in updates {
                cursor.offset = Some(update.update_id + 1);
                let Some(message) = update.message.or(update.channel_post) else {
                    continue;
                };
                if message.chat.id == conversation.target.get() {
                    cursor.pending.push_back(message.incoming());
                } else {
                    debug!(chat_id = message.chat.id, "ignoring message from another chat");
                }
            }
        }
    }
}

// ========================================
// Bot API wire types
// ========================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    first_name: String,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChat {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl From<ApiChat> for ChatEntity {
    fn from(chat: ApiChat) -> Self {
        ChatEntity {
            id: ChatId::new(chat.id),
            title: chat.title,
            first_name: chat.first_name,
            last_name: chat.last_name,
            username: chat.username,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    chat: ApiChat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    caption: Option<String>,
}

impl Message {
    fn sent(&self) -> SentMessage {
        SentMessage {
            chat_id: ChatId::new(self.chat.id),
            message_id: self.message_id,
        }
    }

    fn incoming(self) -> IncomingMessage {
        IncomingMessage {
            chat_id: ChatId::new(self.chat.id),
            message_id: self.message_id,
            text: self.text.or(self.caption),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    channel_post: Option<Message>,
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ChatError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(network)?;
    let envelope: ApiResponse<T> = serde_json::from_slice(&bytes)
        .map_err(|e| ChatError::Decode(format!("HTTP {status}: {e}")))?;

    if envelope.ok {
        return envelope
            .result
            .ok_or_else(|| ChatError::Decode("response has no result".to_string()));
    }

    let description = envelope
        .description
        .unwrap_or_else(|| status.to_string());
    let retry_after = envelope.parameters.and_then(|p| p.retry_after);
    let code = envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16()));
    Err(classify_api_error(code, description, retry_after))
}

fn classify_api_error(code: i64, description: String, retry_after: Option<u64>) -> ChatError {
    if let Some(seconds) = retry_after {
        return ChatError::FloodWait { seconds };
    }
    match code {
        401 => ChatError::Unauthorized(description),
        403 => ChatError::Forbidden(description),
        400 if description.to_ascii_lowercase().contains("chat not found") => {
            ChatError::NotFound(description)
        }
        _ => ChatError::Api { code, description },
    }
}

// URL には token が含まれるので落とす
fn network(err: reqwest::Error) -> ChatError {
    ChatError::Network(err.without_url().to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::rstest;
    use wiremock::matchers::{body_partial_json, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const TOKEN: &str = "123:abc";

    fn client(server: &MockServer) -> BotApiClient {
        BotApiClient::new(BotApiConfig::new(TOKEN).with_base_url(server.uri())).unwrap()
    }

    fn api_path(method: &str) -> String {
        format!("/bot{TOKEN}/{method}")
    }

    fn ok(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
    }

    fn message(chat_id: i64, message_id: i64, text: &str) -> Value {
        json!({
            "message_id": message_id,
            "chat": { "id": chat_id, "type": "private", "first_name": "Bot" },
            "date": 0,
            "text": text,
        })
    }

    #[tokio::test]
    async fn connect_returns_the_bot_account() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("getMe")))
            .respond_with(ok(json!({ "id": 42, "is_bot": true, "first_name": "Signer" })))
            .expect(1)
            .mount(&server)
            .await;

        let account = client(&server).connect().await.unwrap();

        assert_eq!(account.id, 42);
        assert_eq!(account.first_name, "Signer");
    }

    #[tokio::test]
    async fn resolve_target_uses_chat_title() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("getChat")))
            .and(body_partial_json(json!({ "chat_id": -100 })))
            .respond_with(ok(json!({ "id": -100, "type": "supergroup", "title": "Check-in" })))
            .mount(&server)
            .await;

        let entity = client(&server).resolve_target(ChatId::new(-100)).await.unwrap();

        assert_eq!(entity.display_name(), "Check-in");
    }

    #[tokio::test]
    async fn send_text_passes_parse_mode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("sendMessage")))
            .and(body_partial_json(json!({
                "chat_id": 7,
                "text": "<b>hi</b>",
                "parse_mode": "HTML",
            })))
            .respond_with(ok(message(7, 55, "<b>hi</b>")))
            .expect(1)
            .mount(&server)
            .await;

        let sent = client(&server)
            .send_text(ChatId::new(7), "<b>hi</b>", Some(ParseMode::Html))
            .await
            .unwrap();

        assert_eq!(sent.message_id, 55);
    }

    #[rstest]
    #[case::flood(429, json!({ "retry_after": 30 }), "Too Many Requests: retry after 30")]
    #[case::unauthorized(401, Value::Null, "Unauthorized")]
    #[case::forbidden(403, Value::Null, "Forbidden: bot was blocked by the user")]
    #[case::bot_to_bot(403, Value::Null, "Forbidden: bot can't send messages to bots")]
    #[case::not_found(400, Value::Null, "Bad Request: chat not found")]
    #[case::other(400, Value::Null, "Bad Request: message text is empty")]
    #[tokio::test]
    async fn api_errors_are_classified(
        #[case] code: u16,
        #[case] parameters: Value,
        #[case] description: &str,
    ) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("sendMessage")))
            .respond_with(ResponseTemplate::new(code).set_body_json(json!({
                "ok": false,
                "error_code": code,
                "description": description,
                "parameters": parameters,
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .send_text(ChatId::new(7), "hi", None)
            .await
            .unwrap_err();

        match code {
            429 => assert_eq!(err.flood_wait_secs(), Some(30)),
            401 => assert!(matches!(err, ChatError::Unauthorized(_))),
            403 => assert!(matches!(err, ChatError::Forbidden(_))),
            _ if description.contains("chat not found") => {
                assert!(matches!(err, ChatError::NotFound(_)))
            }
            _ => assert!(matches!(err, ChatError::Api { code: 400, .. })),
        }
    }

    #[tokio::test]
    async fn unparsable_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("getMe")))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let err = client(&server).connect().await.unwrap_err();

        assert!(matches!(err, ChatError::Decode(_)));
    }

    #[tokio::test]
    async fn network_errors_do_not_leak_the_token() {
        // nothing listens on port 9
        let client =
            BotApiClient::new(BotApiConfig::new(TOKEN).with_base_url("http://127.0.0.1:9")).unwrap();

        let err = client.connect().await.unwrap_err();

        assert!(matches!(err, ChatError::Network(_)));
        assert!(!err.to_string().contains(TOKEN));
    }

    #[tokio::test]
    async fn remote_file_is_sent_by_reference() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("sendDocument")))
            .and(body_partial_json(json!({
                "chat_id": 7,
                "document": "https://example.com/a.pdf",
                "caption": "daily",
            })))
            .respond_with(ok(message(7, 60, "")))
            .expect(1)
            .mount(&server)
            .await;

        let sent = client(&server)
            .send_file(ChatId::new(7), "https://example.com/a.pdf", Some("daily"))
            .await
            .unwrap();

        assert_eq!(sent.message_id, 60);
    }

    #[tokio::test]
    async fn local_file_is_uploaded_as_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("sendDocument")))
            .and(header_regex("content-type", "^multipart/form-data"))
            .respond_with(ok(message(7, 61, "")))
            .expect(1)
            .mount(&server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "check-in log").unwrap();
        let file_path = file.path().to_string_lossy().into_owned();

        let sent = client(&server)
            .send_file(ChatId::new(7), &file_path, None)
            .await
            .unwrap();

        assert_eq!(sent.message_id, 61);
    }

    #[tokio::test]
    async fn sync_dialogs_skips_the_backlog() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("getUpdates")))
            .and(body_partial_json(json!({ "offset": -1 })))
            .respond_with(ok(json!([{ "update_id": 900, "message": message(7, 3, "old") }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(client.sync_dialogs().await.unwrap(), 1);
        assert_eq!(client.updates.lock().await.offset, Some(901));
    }

    #[tokio::test]
    async fn await_next_message_returns_only_newer_messages_from_the_target() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(api_path("getUpdates")))
            .respond_with(ok(json!([
                { "update_id": 10, "message": message(8, 90, "other chat") },
                { "update_id": 11, "message": message(7, 4, "before send") },
                { "update_id": 12, "message": message(7, 6, "signed in") },
            ])))
            .mount(&server)
            .await;

        let client = client(&server);
        let conversation = ConversationHandle::open(&SentMessage {
            chat_id: ChatId::new(7),
            message_id: 5,
        });

        let reply = client
            .await_next_message(&conversation, Duration::from_secs(2))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reply.message_id, 6);
        assert_eq!(reply.text.as_deref(), Some("signed in"));
        assert_eq!(client.updates.lock().await.offset, Some(13));
    }

    #[test]
    fn debug_output_hides_the_token() {
        let config = BotApiConfig::new(TOKEN);
        assert!(!format!("{config:?}").contains(TOKEN));
    }
}
