use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use task_capture::backend::{GuardedBackend, TaskBackend};
use task_capture::bot::{build_handler, ChatTransport, DialogueEngine, TelegramTransport};
use task_capture::config::BotConfig;
use task_capture::localization::init_localization;
use task_capture::notion::NotionClient;
use task_capture::recovery::retry_with_backoff;
use task_capture::shutdown::ShutdownSignal;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();
    info!("Starting task capture bot");

    init_localization().context("Failed to load messages")?;
    let config = BotConfig::from_env().context("Invalid configuration")?;

    let notion = NotionClient::new(&config.notion).context("Failed to create Notion client")?;
    let backend: Arc<dyn TaskBackend> =
        Arc::new(GuardedBackend::new(notion, config.recovery.clone()));

    let bot = Bot::new(&config.telegram_token);
    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::new(bot.clone()));
    let engine = DialogueEngine::new(config.dialog.clone(), backend, transport);

    let shutdown = ShutdownSignal::new();
    shutdown.listen_for_ctrl_c();

    let mut restarts = 0;
    loop {
        let connect = retry_with_backoff("telegram connect", &config.recovery, || bot.get_me().send());
        let me = tokio::select! {
            result = connect => result.context("Failed to connect to Telegram")?,
            _ = shutdown.requested() => {
                info!("Shutdown requested while connecting, stopping");
                return Ok(());
            }
        };
        info!(username = ?me.username, "Connected to Telegram, starting dispatcher");

        let mut dispatcher = Dispatcher::builder(bot.clone(), build_handler())
            .dependencies(dptree::deps![engine.clone()])
            .build();
        shutdown.register(dispatcher.shutdown_token());

        if !shutdown.is_requested() {
            dispatcher.dispatch().await;
        }

        if shutdown.is_requested() {
            info!("Shutdown requested, stopping");
            return Ok(());
        }

        restarts += 1;
        if restarts > config.recovery.max_retries {
            error!(restarts, "Dispatcher stopped too many times, giving up");
            return Err(anyhow!("dispatcher stopped {restarts} times"));
        }
        warn!(restarts, "Dispatcher stopped unexpectedly, restarting");
    }
}
