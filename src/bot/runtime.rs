//! Bot runtime - long polling runner.

use teloxide::prelude::*;
use tracing::info;

use super::dispatcher::ElainaBot;

/// Run the bot with long polling until shutdown.
pub async fn run(
    mut dispatcher: Dispatcher<ElainaBot, anyhow::Error, teloxide::dispatching::DefaultKey>,
) {
    info!("Starting bot in polling mode...");
    dispatcher.dispatch().await;
}
