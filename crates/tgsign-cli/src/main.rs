use std::process::ExitCode;
use std::sync::Arc;

use tgsign_core::config::Settings;
use tgsign_core::impls::{BotApiClient, BotApiNotifier};
use tgsign_core::ports::Notifier;
use tgsign_core::{BatchRunner, RunnerBuilder};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_SESSION: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

fn init_tracing() {
    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::new("info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// 設定 → クライアント → ランナーの順に組み立てる
fn wire(settings: &Settings) -> Result<BatchRunner, String> {
    let telegram = &settings.telegram;
    let api = telegram.bot_api_config();

    let client = BotApiClient::new(api.clone()).map_err(|e| format!("http client: {e}"))?;
    let mut builder = RunnerBuilder::new(Arc::new(client)).reply_window(settings.reply_window);

    if let Some(chat_id) = telegram.notify_chat_id {
        let notifier = BotApiNotifier::new(&api, chat_id, telegram.http_timeout)
            .map_err(|e| format!("notifier: {e}"))?;
        builder = builder.notifier(Arc::new(notifier) as Arc<dyn Notifier>);
    }

    builder.build().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env は任意
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "loaded .env");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "tgsign starting");

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "configuration error");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    info!(tasks = settings.tasks.len(), "configuration loaded");

    let runner = match wire(&settings) {
        Ok(runner) => runner,
        Err(err) => {
            error!(error = %err, "configuration error");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    tokio::select! {
        result = runner.run(&settings.tasks) => match result {
            Ok(summary) => {
                info!(run_id = %summary.run_id, "tgsign finished");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!(error = %err, "tgsign aborted");
                ExitCode::from(EXIT_SESSION)
            }
        },
        () = interrupted(tokio::signal::ctrl_c()) => {
            warn!("interrupted, current task result is not reported");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

/// Ctrl-C を待つ。ハンドラを登録できなければ警告だけ出して永久に待つ
async fn interrupted(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => {}
        Err(err) => {
            warn!(error = %err, "cannot listen for Ctrl-C, running without it");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn ctrl_c_interrupts() {
        let fired = tokio::time::timeout(Duration::from_secs(1), interrupted(async { Ok(()) })).await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn failed_signal_listener_never_interrupts_the_batch() {
        let listener = interrupted(async { Err(io::Error::other("no signal driver")) });
        let fired = tokio::time::timeout(Duration::from_millis(50), listener).await;
        assert!(fired.is_err());
    }
}
