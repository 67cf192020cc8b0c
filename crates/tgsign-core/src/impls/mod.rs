//! Impls - ports の実装
//!
//! # 本番用
//! - **BotApiClient**: Telegram Bot API 上の ChatClient
//! - **BotApiNotifier**: バッチ終了サマリーの通知
//! - **LogReportSink**: レポートを tracing に出力
//!
//! # テスト用
//! - **ScriptedChatClient**: チャットごとのスクリプトを再生する ChatClient
//! - **MemoryReportSink** / **MemoryNotifier**: 受け取った内容を記録するだけ

pub mod bot_api;
pub mod log_sink;
pub mod memory;
pub mod notifier;
pub mod scripted;

// 主要な型を再エクスポート
pub use self::bot_api::{BotApiClient, BotApiConfig, DEFAULT_API_BASE, DEFAULT_HTTP_TIMEOUT};
pub use self::log_sink::LogReportSink;
pub use self::memory::{MemoryNotifier, MemoryReportSink, RecordedReport};
pub use self::notifier::BotApiNotifier;
pub use self::scripted::{ChatScript, ScriptedChatClient, SentRecord};
