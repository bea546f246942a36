use std::sync::Arc;

use anyhow::Result;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use withlily::bot::{self, Router, TelegramNotifier};
use withlily::config::AppConfig;
use withlily::dialogue::ConversationState;
use withlily::localization::{detect_language, init_localization, FALLBACK_LANGUAGE};
use withlily::scheduler::ReminderScheduler;
use withlily::storage::open_storage;

const DEFAULT_LOG_FILTER: &str = "withlily=info,teloxide=warn";

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();

    info!("Starting withLily assistant bot");

    let config = AppConfig::from_env()?;
    init_localization()?;
    let default_language = detect_language(Some(config.default_language.as_str()), FALLBACK_LANGUAGE);

    let storage = open_storage(&config).await?;

    let bot = Bot::new(config.bot_token.clone());

    let scheduler = ReminderScheduler::new(
        Arc::clone(&storage),
        Arc::new(TelegramNotifier::new(bot.clone())),
        config.reminder_time,
        config.reminder_tick,
        default_language,
    )
    .spawn();

    let router = Arc::new(Router::new(
        Arc::clone(&storage),
        config.average_policy,
        default_language,
    ));

    info!(backend = ?config.storage_backend, "Bot initialized, starting dispatcher");

    let handler = Update::filter_message()
        .enter_dialogue::<Message, InMemStorage<ConversationState>, ConversationState>()
        .endpoint(bot::message_handler);
    let callbacks = Update::filter_callback_query()
        .enter_dialogue::<CallbackQuery, InMemStorage<ConversationState>, ConversationState>()
        .endpoint(bot::callback_handler);

    Dispatcher::builder(bot, dptree::entry().branch(handler).branch(callbacks))
        .dependencies(dptree::deps![InMemStorage::<ConversationState>::new(), router])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    scheduler.shutdown().await;
    info!("Bot stopped");

    Ok(())
}
