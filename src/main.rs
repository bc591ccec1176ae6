use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use tunelink::core::{config, init_logger};
use tunelink::download::fetcher::{log_ytdlp_version, YtDlpFetcher};
use tunelink::download::orchestrator::DownloadOrchestrator;
use tunelink::resolver::SongResolver;
use tunelink::storage::create_pool;
use tunelink::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramSink};

/// Main entry point for the Telegram bot
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Catch dispatcher panics so they are logged instead of silently
    // terminating the process
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    run_bot().await
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");

    // Startup diagnostic: a missing yt-dlp only disables downloads
    log_ytdlp_version().await;

    let bot = create_bot()?;

    let bot_info = bot.get_me().await?;
    let bot_username = bot_info.user.username.clone();
    log::info!("Bot username: {:?}, Bot ID: {}", bot_username, bot_info.user.id);

    setup_bot_commands(&bot).await?;

    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );

    let resolver = Arc::new(SongResolver::from_env()?);
    let fetcher = Arc::new(YtDlpFetcher::from_env());
    let sink = Arc::new(TelegramSink::new(bot.clone(), bot_username.clone()));
    let orchestrator = Arc::new(DownloadOrchestrator::new(
        Arc::clone(&db_pool),
        fetcher,
        sink,
        Arc::clone(&resolver),
        config::queue::MAX_CONCURRENT_DOWNLOADS,
    ));

    let handler = schema(HandlerDeps {
        db_pool,
        resolver,
        orchestrator,
        bot_username,
    });

    log::info!("Starting bot in long polling mode");

    // Drop pending updates on start so a restart does not replay stale
    // download requests
    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, handler)
        .dependencies(DependencyMap::new())
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
