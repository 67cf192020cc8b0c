//! Domain model (tasks, ids, outcomes, batch state, errors).
//!
//! 外部システム（チャットプラットフォーム、環境変数）には依存しません。

pub mod conversation;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod state;
pub mod task;

pub use conversation::{
    Account, ChatEntity, ConversationHandle, IncomingMessage, SentMessage, NON_TEXT_PLACEHOLDER,
};
pub use errors::{ChatError, ConfigError, SessionError, TaskValidationError};
pub use ids::{ChatId, ExecutionId, RunId};
pub use outcome::{Execution, SkipReason, TaskOutcome, TaskResult};
pub use state::BatchState;
pub use task::{MessageType, ParseMode, RawSignTask, SignTask, TaskPayload};
