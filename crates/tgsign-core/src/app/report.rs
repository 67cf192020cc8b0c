//! Report rendering.
//!
//! Pure formatting for per-task blocks and the end-of-batch summary.
//! Nothing here parses these strings back.

use crate::domain::{ChatId, Execution, TaskOutcome, TaskResult};
use crate::ports::TaskPosition;

use super::runner::BatchSummary;

const RULE_WIDTH: usize = 50;
const SEPARATOR_WIDTH: usize = 40;

/// Render one task's report block.
pub fn render_task_report(position: TaskPosition, chat_id: ChatId, execution: &Execution) -> String {
    match execution {
        Execution::Finished(result) => render_result(position, result),
        Execution::Skipped { .. } => format!(
            "⏭️ Task {}/{} skipped: no chat_id (ID: {chat_id})",
            position.number, position.total
        ),
    }
}

fn render_result(position: TaskPosition, result: &TaskResult) -> String {
    let rule = "=".repeat(RULE_WIDTH);

    let replies = if result.replies.is_empty() {
        "   (no reply)\n".to_string()
    } else {
        result
            .replies
            .iter()
            .enumerate()
            .map(|(n, reply)| format!("   └─ [{}] {}\n", n + 1, reply.trim()))
            .collect()
    };
    let outcome = match &result.outcome {
        TaskOutcome::Completed => String::new(),
        TaskOutcome::RateLimited { wait_secs } => {
            format!("⏳ Rate limited: retry after {wait_secs}s\n")
        }
        TaskOutcome::Failed { reason } => format!("❌ Failed: {reason}\n"),
    };

    format!(
        "\n{rule}\nTask {}/{}\n👤 Target: {} (ID: {})\n{}\n📤 Sent: {}\n📥 Replies:\n{replies}{outcome}{rule}",
        position.number,
        position.total,
        result.target_name,
        result.chat_id,
        "─".repeat(SEPARATOR_WIDTH),
        result.sent_summary,
    )
}

/// One-line end-of-batch summary, also used as the notification body.
pub fn render_summary(summary: &BatchSummary) -> String {
    format!(
        "Sign batch {} finished: {} completed, {} rate limited, {} failed, {} skipped ({} total)",
        summary.run_id,
        summary.completed,
        summary.rate_limited,
        summary.failed,
        summary.skipped,
        summary.total,
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ulid::Ulid;

    use super::*;
    use crate::domain::{BatchState, ExecutionId, RunId, SkipReason};

    fn position() -> TaskPosition {
        TaskPosition {
            number: 2,
            total: 5,
        }
    }

    fn result(replies: &[&str], outcome: TaskOutcome) -> Execution {
        Execution::Finished(TaskResult {
            execution_id: ExecutionId::from_ulid(Ulid::nil()),
            target_name: "Check-in Bot".into(),
            chat_id: ChatId::new(42),
            sent_summary: "/checkin".into(),
            replies: replies.iter().map(|r| r.to_string()).collect(),
            outcome,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        })
    }

    #[test]
    fn block_lists_replies_in_order() {
        let text = render_task_report(
            position(),
            ChatId::new(42),
            &result(&["ok ", "streak 3"], TaskOutcome::Completed),
        );

        assert!(text.contains("Task 2/5"));
        assert!(text.contains("👤 Target: Check-in Bot (ID: 42)"));
        assert!(text.contains("📤 Sent: /checkin"));
        let first = text.find("└─ [1] ok").unwrap();
        let second = text.find("└─ [2] streak 3").unwrap();
        assert!(first < second);
        assert!(!text.contains("Failed"));
    }

    #[test]
    fn block_layout() {
        let text = render_task_report(
            position(),
            ChatId::new(42),
            &result(&[], TaskOutcome::Completed),
        );

        let rule = "=".repeat(50);
        let expected = format!(
            "\n{rule}\nTask 2/5\n👤 Target: Check-in Bot (ID: 42)\n{}\n📤 Sent: /checkin\n📥 Replies:\n   (no reply)\n{rule}",
            "─".repeat(40)
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn empty_replies_render_absence_marker() {
        let text = render_task_report(
            position(),
            ChatId::new(42),
            &result(&[], TaskOutcome::Completed),
        );
        assert!(text.contains("(no reply)"));
    }

    #[test]
    fn abandoned_tasks_show_their_outcome() {
        let limited = render_task_report(
            position(),
            ChatId::new(42),
            &result(&[], TaskOutcome::RateLimited { wait_secs: 30 }),
        );
        assert!(limited.contains("retry after 30s"));

        let failed = render_task_report(
            position(),
            ChatId::new(42),
            &result(&[], TaskOutcome::Failed { reason: "network: reset".into() }),
        );
        assert!(failed.contains("❌ Failed: network: reset"));
    }

    #[test]
    fn skip_marker_is_a_single_line() {
        let text = render_task_report(
            position(),
            ChatId::new(0),
            &Execution::Skipped {
                reason: SkipReason::MissingChatId,
            },
        );
        assert!(!text.contains('\n'));
        assert!(text.contains("skipped"));
    }

    #[test]
    fn summary_counts_everything() {
        let summary = BatchSummary {
            run_id: RunId::from_ulid(Ulid::nil()),
            total: 5,
            completed: 2,
            rate_limited: 1,
            failed: 1,
            skipped: 1,
            final_state: BatchState::Done,
        };
        let line = render_summary(&summary);
        assert!(line.contains("2 completed, 1 rate limited, 1 failed, 1 skipped (5 total)"));
        assert!(line.starts_with("Sign batch run-"));
    }
}
