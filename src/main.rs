//! # Main Entry Point
//!
//! Wires the layers together:
//! - Domain: Configuration and Types
//! - Infrastructure: Telegram, Price Feed
//! - Application: Router, Vote State Machine, Snapshot Store
//! - Interface: Command Handlers
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teloxide::prelude::*;
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::application::router::EventRouter;
use crate::application::store::{JsonFileStore, MemoryStore, SnapshotStore};
use crate::application::vote::{VoteMachine, VoteSettings};
use crate::domain::config::AppConfig;
use crate::domain::paths;
use crate::domain::traits::{ChatProvider, PriceFeed};
use crate::infrastructure::rates::RatesService;
use crate::infrastructure::telegram::{self, TelegramService};
use crate::strings::logs;

/// Group vote and price relay bot for Telegram.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value_t = paths::config_path(paths::DATA_DIR))]
    config: String,
}

const EVENT_QUEUE: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load Configuration
    let config = AppConfig::load(Path::new(&args.config))?;

    // 2. Logging Setup
    let data_dir = PathBuf::from(&config.system.data_dir);
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
    }

    // Clear previous session log
    let log_path = data_dir.join(&config.system.log_file);
    if log_path.exists() {
        let _ = fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(&data_dir, &config.system.log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,teloxide=warn,reqwest=warn,hyper=warn")
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("{}", logs::STARTING);
    tracing::info!("{}", logs::config_loaded(&args.config));

    // 3. Initialize Infrastructure
    let token = config.services.telegram.resolve_token()?;
    let bot = Bot::new(token);
    let me = bot.get_me().await.context("Failed to reach Telegram")?;
    let bot_name = me.username().to_string();
    tracing::info!("{}", logs::logged_in(&bot_name));

    let chat: Arc<dyn ChatProvider> = Arc::new(TelegramService::new(bot.clone()));
    let prices: Arc<dyn PriceFeed> = Arc::new(RatesService::new(&config.rates)?);

    // 4. Initialize Application Components
    let snapshot = config.snapshot_path();
    tracing::info!(
        "{}",
        logs::snapshot_location(snapshot.as_deref().and_then(Path::to_str))
    );
    let store: Box<dyn SnapshotStore> = match snapshot {
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => Box::new(MemoryStore::default()),
    };
    let vote = VoteMachine::new(
        VoteSettings {
            chat_id: config.vote.chat_id,
            duration: config.vote.duration(),
            create_timeout: config.vote.create_timeout(),
        },
        chat.clone(),
        store,
    );
    let tick_every = Duration::from_millis(config.system.tick_interval_ms);
    let router = EventRouter::new(config, bot_name, chat, prices, vote);

    // 5. Event Loop
    let (tx, rx) = mpsc::channel(EVENT_QUEUE);
    let listener = tokio::spawn(async move {
        telegram::listen(bot, tx).await;
        tracing::info!("{}", logs::LISTENER_STOPPED);
    });

    tokio::select! {
        _ = router.run(rx, tick_every) => {}
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => tracing::info!("{}", logs::SHUTDOWN),
            Err(e) => tracing::error!("{}", logs::shutdown_fail(&e.to_string())),
        },
    }
    listener.abort();

    Ok(())
}
