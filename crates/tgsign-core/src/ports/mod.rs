//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部システム（チャットプラットフォーム、ログ、通知先）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod chat_client;
pub mod clock;
pub mod id_generator;
pub mod notifier;
pub mod report_sink;

// 主要な trait を再エクスポート
pub use self::chat_client::ChatClient;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::notifier::Notifier;
pub use self::report_sink::{ReportSink, TaskPosition};
