//! Image generation handler.
//!
//! Sits first in the chain: the generation pattern is content-based and must
//! win over vision (an image with a "buatin gambar" caption is a generation
//! request, not a description request).

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, MessageId, ReplyParameters};
use tracing::{info, warn};

use crate::bot::ElainaBot;
use crate::llm::GeminiClient;
use crate::router::chain::{Handler, HandlerCategory};
use crate::router::envelope::MessageEnvelope;

pub struct ImageGenHandler {
    bot: ElainaBot,
    gemini: Arc<GeminiClient>,
    pattern: Regex,
}

impl ImageGenHandler {
    /// # Panics
    /// Panics if the trigger word escapes into an invalid pattern (it
    /// cannot: the word is regex-escaped).
    pub fn new(bot: ElainaBot, gemini: Arc<GeminiClient>, trigger: &str, prefix: char) -> Self {
        let pattern = Regex::new(&format!(
            r"(?i)({}\s+buatin\s+gambar|{}gambar)",
            regex::escape(trigger),
            regex::escape(&prefix.to_string()),
        ))
        .expect("valid image generation pattern");
        Self { bot, gemini, pattern }
    }

    fn extract_prompt(&self, text: &str) -> Option<String> {
        if !self.pattern.is_match(text) {
            return None;
        }
        Some(self.pattern.replace(text, "").trim().to_string())
    }
}

#[async_trait]
impl Handler for ImageGenHandler {
    fn name(&self) -> &'static str {
        "imggen"
    }

    fn category(&self) -> HandlerCategory {
        HandlerCategory::Priority
    }

    async fn try_handle(&self, env: &MessageEnvelope) -> Result<bool> {
        let Some(prompt) = self.extract_prompt(&env.raw_text) else {
            return Ok(false);
        };

        let chat_id = ChatId(env.chat_id);
        let reply = ReplyParameters::new(MessageId(env.message_id));

        if prompt.is_empty() {
            self.bot
                .send_message(chat_id, "Mau gambar apa? Tulis deskripsinya setelah perintahnya.")
                .reply_parameters(reply)
                .await?;
            return Ok(true);
        }

        info!("chat {}: generating image for \"{}\"", env.chat_id, prompt);

        match self.gemini.generate_image(&prompt).await {
            Ok(bytes) => {
                self.bot
                    .send_photo(chat_id, InputFile::memory(bytes).file_name("elaina.png"))
                    .reply_parameters(reply)
                    .await?;
            }
            Err(err) => {
                warn!("image generation failed: {}", err);
                self.bot
                    .send_message(
                        chat_id,
                        "Maaf, gambarnya gagal dibuat. Coba lagi sebentar lagi ya.",
                    )
                    .reply_parameters(reply)
                    .await?;
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler_pattern() -> Regex {
        Regex::new(r"(?i)(elaina\s+buatin\s+gambar|!gambar)").unwrap()
    }

    #[test]
    fn test_pattern_matches_both_forms() {
        let p = handler_pattern();
        assert!(p.is_match("elaina buatin gambar kucing"));
        assert!(p.is_match("Elaina  Buatin   Gambar senja"));
        assert!(p.is_match("!gambar naga merah"));
        assert!(!p.is_match("elaina gambar kucing"));
    }

    #[test]
    fn test_prompt_is_the_remainder() {
        let p = handler_pattern();
        let text = "elaina buatin gambar kucing oren tidur";
        assert_eq!(p.replace(text, "").trim(), "kucing oren tidur");
    }
}
