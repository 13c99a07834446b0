//! Elaina - conversational Telegram bot with group moderation.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - MongoDB repositories (chat state, warns, memory)
//! - `permissions` - Admin checking with caching
//! - `router` - envelope, matcher, gating policy and the handler chain
//! - `handlers` - feature handlers behind the chain
//! - `moderation` - rules storage, warning ledger and escalation
//! - `llm` - Gemini client with key rotation
//! - `bot` - Telegram wiring (with Throttle for API rate limiting)

mod bot;
mod config;
mod database;
mod handlers;
mod llm;
mod moderation;
mod permissions;
mod router;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use bot::ElainaBot;
use config::Config;
use database::{ChatStateRepo, Database, MemoryRepo, ModerationRepo};
use handlers::commands::Commands;
use handlers::fallback::FallbackResponder;
use handlers::imggen::ImageGenHandler;
use handlers::tiktok::TikTokHandler;
use handlers::tts::TtsHandler;
use handlers::vision::VisionHandler;
use llm::GeminiClient;
use moderation::{GeminiJudge, ModerationEngine, RedeemDetector, TelegramModeration};
use permissions::Permissions;
use router::chain::Handler;
use router::matcher::build_trigger_regex;
use router::Router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("elaina=info,teloxide=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Elaina bot...");

    let config = Config::from_env();
    info!("Configuration loaded successfully");

    info!("Connecting to MongoDB...");
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    info!("Database connected");

    let chat_state = Arc::new(ChatStateRepo::new(&db));
    let memory = Arc::new(MemoryRepo::new(&db));
    let moderation_repo = Arc::new(ModerationRepo::new(&db));

    let handler_timeout = Duration::from_secs(config.handler_timeout_secs);
    let gemini = Arc::new(GeminiClient::new(config.gemini_keys.clone(), handler_timeout)?);
    let http = reqwest::Client::builder().timeout(handler_timeout).build()?;

    // Throttle respects Telegram's rate limits (30 msg/s globally,
    // 20 msg/min per group).
    let bot: ElainaBot = Bot::new(&config.bot_token).throttle(Limits::default());
    info!("Bot initialized with rate limiting (Throttle)");

    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let permissions = Permissions::new(bot.inner().clone(), config.owner_ids.clone());

    // Moderation requires its own API key; without it the engine is off and
    // !peraturan answers with a hint.
    let moderation = match &config.moderation_api_key {
        Some(key) => {
            let judge = Arc::new(GeminiJudge::new(
                key.clone(),
                config.moderation_prompt.clone(),
            )?);
            info!("Moderation enabled (warn limit {})", config.warn_limit);
            let transport = Arc::new(TelegramModeration::new(bot.clone(), permissions.clone()));
            Some(Arc::new(
                ModerationEngine::new(
                    transport,
                    moderation_repo,
                    judge,
                    config.bot_name.clone(),
                    config.warn_limit,
                )
                .with_redeem(RedeemDetector::new(config.redeem_keywords.clone())),
            ))
        }
        None => {
            info!("PERATURAN_APIKEY not set, moderation disabled");
            None
        }
    };

    let trigger = build_trigger_regex(&config.trigger);

    // Chain order is part of the dispatch contract: content patterns first,
    // then media, then text.
    let mut chain_handlers: Vec<Arc<dyn Handler>> = vec![
        Arc::new(ImageGenHandler::new(
            bot.clone(),
            gemini.clone(),
            &config.trigger,
            config.command_prefix,
        )),
        Arc::new(TikTokHandler::new(bot.clone(), http.clone())),
        Arc::new(VisionHandler::new(
            bot.clone(),
            gemini.clone(),
            chat_state.clone(),
            http.clone(),
            config.bot_token.clone(),
            trigger.clone(),
        )),
    ];
    if let Some(key) = &config.eleven_api_key {
        chain_handlers.push(Arc::new(TtsHandler::new(
            bot.clone(),
            gemini.clone(),
            chat_state.clone(),
            http.clone(),
            key.clone(),
            config.eleven_voice.clone(),
            config.vn_max_words,
        )));
    } else {
        info!("ELEVENLABS_API_KEY not set, voice notes disabled");
    }

    let commands = Commands::new(
        bot.clone(),
        chat_state.clone(),
        moderation.clone(),
        config.trigger.clone(),
        config.command_prefix,
    );
    let fallback = FallbackResponder::new(
        bot.clone(),
        gemini,
        chat_state,
        memory,
        config.memory_turns,
        config.memory_char_budget,
    );

    let router = Arc::new(Router::new(
        commands,
        handlers::build_chain(chain_handlers),
        fallback,
        moderation,
        trigger,
        config.command_prefix,
        handler_timeout,
    ));

    let dispatcher = bot::build_dispatcher(bot, router);
    bot::run(dispatcher).await;

    Ok(())
}
