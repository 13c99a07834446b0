//! Message dispatcher setup.
//!
//! One endpoint: every message is normalized into an envelope and handed to
//! the router. All feature selection happens there, not in dptree branches.

use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::error;

use crate::router::envelope::MessageEnvelope;
use crate::router::Router;

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ElainaBot = Throttle<Bot>;

/// Build the dispatcher around a fully wired router.
pub fn build_dispatcher(
    bot: ElainaBot,
    router: Arc<Router>,
) -> Dispatcher<ElainaBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build()
}

fn schema() -> UpdateHandler<anyhow::Error> {
    use teloxide::dispatching::UpdateFilterExt;

    Update::filter_message().endpoint(route_message)
}

async fn route_message(msg: Message, router: Arc<Router>) -> anyhow::Result<()> {
    // Other bots' messages never enter the router.
    if msg.from.as_ref().is_some_and(|u| u.is_bot) {
        return Ok(());
    }

    let Some(env) = MessageEnvelope::from_message(&msg) else {
        return Ok(());
    };

    if let Err(err) = router.dispatch(env).await {
        error!("dispatch failed for chat {}: {:#}", msg.chat.id, err);
    }

    Ok(())
}
