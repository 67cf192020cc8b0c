//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **RunnerBuilder**: BatchRunner の構築とワイヤリング
//! - **BatchRunner**: セッション確立とタスクの逐次実行
//! - **TaskExecutor**: 1 タスクの delay → resolve → send → collect
//! - **collector**: idle / ceiling の 2 つのタイマーによる返信収集
//! - **report**: レポートブロックとサマリーの整形

pub mod builder;
pub mod collector;
pub mod executor;
pub mod report;
pub mod runner;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, RunnerBuilder};
pub use self::collector::{ReplyWindow, WindowEnd, collect_replies};
pub use self::executor::{TaskExecutor, classify};
pub use self::report::{render_summary, render_task_report};
pub use self::runner::{BatchRunner, BatchSummary};
