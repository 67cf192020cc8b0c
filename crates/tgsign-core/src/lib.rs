//! tgsign-core
//!
//! Core building blocks for the Telegram sign-in task runner.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, conversation, outcome, state, errors）
//! - **ports**: 抽象化レイヤー（ChatClient, ReportSink, Notifier, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, runner, executor, collector, report）
//! - **impls**: 実装（BotApiClient, BotApiNotifier, LogReportSink とテスト用のダブル）
//! - **config**: 環境変数からの設定読み込み

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{BatchRunner, BatchSummary, BuildError, ReplyWindow, RunnerBuilder};
pub use config::Settings;
pub use domain::{ChatError, ConfigError, SessionError, SignTask};
