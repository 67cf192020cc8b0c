//! Config - 環境変数からの設定読み込み
//!
//! タスクはすべてここで検証されます。1 件でも不正なら、
//! ネットワークに触れる前に `ConfigError` で停止します。

use std::time::Duration;

use crate::app::ReplyWindow;
use crate::domain::{ChatId, ConfigError, RawSignTask, SignTask};
use crate::impls::{BotApiConfig, DEFAULT_API_BASE, DEFAULT_HTTP_TIMEOUT};

pub const BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const SIGN_TASKS_VAR: &str = "TELEGRAM_SIGN_TASKS";
pub const API_BASE_VAR: &str = "TELEGRAM_API_BASE";
pub const NOTIFY_CHAT_ID_VAR: &str = "TELEGRAM_NOTIFY_CHAT_ID";
pub const REPLY_IDLE_VAR: &str = "TELEGRAM_REPLY_IDLE_SECS";
pub const REPLY_CEILING_VAR: &str = "TELEGRAM_REPLY_CEILING_SECS";
pub const HTTP_TIMEOUT_VAR: &str = "TELEGRAM_HTTP_TIMEOUT_SECS";

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub tasks: Vec<SignTask>,
    pub reply_window: ReplyWindow,
}

#[derive(Clone)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub api_base: String,
    pub notify_chat_id: Option<ChatId>,
    pub http_timeout: Duration,
}

impl TelegramSettings {
    pub fn bot_api_config(&self) -> BotApiConfig {
        BotApiConfig::new(self.bot_token.clone())
            .with_base_url(self.api_base.clone())
            .with_http_timeout(self.http_timeout)
    }
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("notify_chat_id", &self.notify_chat_id)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, which returns `None` for unset variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = required(&lookup, BOT_TOKEN_VAR)?;
        let tasks = parse_tasks(&required(&lookup, SIGN_TASKS_VAR)?)?;

        let api_base = optional(&lookup, API_BASE_VAR).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let notify_chat_id = optional(&lookup, NOTIFY_CHAT_ID_VAR)
            .map(|raw| parse_number::<i64>(NOTIFY_CHAT_ID_VAR, &raw))
            .transpose()?
            .map(ChatId::new);

        let idle = seconds(&lookup, REPLY_IDLE_VAR, ReplyWindow::DEFAULT_IDLE)?;
        let ceiling = seconds(&lookup, REPLY_CEILING_VAR, ReplyWindow::DEFAULT_CEILING)?;
        let http_timeout = seconds(&lookup, HTTP_TIMEOUT_VAR, DEFAULT_HTTP_TIMEOUT)?;

        Ok(Self {
            telegram: TelegramSettings {
                bot_token,
                api_base,
                notify_chat_id,
                http_timeout,
            },
            tasks,
            reply_window: ReplyWindow::new(idle, ceiling),
        })
    }
}

/// Parse and validate a JSON task list. Indices in errors are 1-based.
pub fn parse_tasks(json: &str) -> Result<Vec<SignTask>, ConfigError> {
    let raw: Vec<RawSignTask> = serde_json::from_str(json).map_err(ConfigError::TaskList)?;
    raw.into_iter()
        .enumerate()
        .map(|(i, record)| {
            SignTask::try_from(record).map_err(|source| ConfigError::Task {
                index: i + 1,
                source,
            })
        })
        .collect()
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or(ConfigError::MissingVar(name))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyVar(name));
    }
    Ok(value.trim().to_string())
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn seconds<F>(lookup: &F, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional(lookup, name) {
        Some(raw) => Ok(Duration::from_secs(parse_number::<u64>(name, &raw)?)),
        None => Ok(default),
    }
}

fn parse_number<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        name,
        reason: format!("{raw:?}: {e}"),
    })
}
