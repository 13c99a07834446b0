//! Feature handlers for the dispatch chain.
//!
//! - `commands` - explicit prefix commands, dispatched before the chain
//! - `imggen` - image generation on a content pattern
//! - `tiktok` - TikTok link downloads
//! - `vision` - image understanding
//! - `tts` - voice note synthesis
//! - `fallback` - the conversational responder behind the chain

pub mod commands;
pub mod fallback;
pub mod imggen;
pub mod tiktok;
pub mod tts;
pub mod vision;

use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;

use crate::bot::ElainaBot;
use crate::router::chain::{Handler, HandlerChain};

/// Assemble the chain in its fixed dispatch order.
///
/// Order is part of the contract: content-pattern features (image
/// generation, link downloads) sit in front so they win over the media and
/// text features, and everything here runs before the fallback responder.
pub fn build_chain(handlers: Vec<Arc<dyn Handler>>) -> HandlerChain {
    HandlerChain::new(handlers)
}

/// Download a Telegram file by id.
///
/// getFile resolves the path, then the bytes come from the file endpoint
/// with the same token.
pub async fn download_file(
    bot: &ElainaBot,
    http: &reqwest::Client,
    token: &str,
    file_id: &str,
) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id.to_string()).await?;
    let url = format!("https://api.telegram.org/file/bot{}/{}", token, file.path);

    let resp = http
        .get(&url)
        .send()
        .await
        .context("download telegram file")?;
    if !resp.status().is_success() {
        anyhow::bail!("file endpoint returned status {}", resp.status());
    }

    Ok(resp.bytes().await?.to_vec())
}
