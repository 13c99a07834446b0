//! Image understanding handler.
//!
//! Claims messages carrying a photo (gating has already decided whether
//! media is allowed in this chat). The caption, minus the trigger word,
//! becomes the question; an empty caption asks for a description.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ReplyParameters};
use tracing::warn;

use crate::bot::ElainaBot;
use crate::database::ChatStateRepo;
use crate::handlers::download_file;
use crate::llm::{system_prompt, GeminiClient};
use crate::router::chain::{Handler, HandlerCategory};
use crate::router::envelope::{AttachmentKind, MessageEnvelope};

const DEFAULT_QUESTION: &str = "Jelaskan gambar ini.";

pub struct VisionHandler {
    bot: ElainaBot,
    gemini: Arc<GeminiClient>,
    chat_state: Arc<ChatStateRepo>,
    http: reqwest::Client,
    token: String,
    trigger: Regex,
}

impl VisionHandler {
    pub fn new(
        bot: ElainaBot,
        gemini: Arc<GeminiClient>,
        chat_state: Arc<ChatStateRepo>,
        http: reqwest::Client,
        token: String,
        trigger: Regex,
    ) -> Self {
        Self {
            bot,
            gemini,
            chat_state,
            http,
            token,
            trigger,
        }
    }

}

fn question(trigger: &Regex, caption: &str) -> String {
    let cleaned = trigger.replace_all(caption, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        DEFAULT_QUESTION.to_string()
    } else {
        cleaned.to_string()
    }
}

#[async_trait]
impl Handler for VisionHandler {
    fn name(&self) -> &'static str {
        "vision"
    }

    fn category(&self) -> HandlerCategory {
        HandlerCategory::Media
    }

    async fn try_handle(&self, env: &MessageEnvelope) -> Result<bool> {
        if env.attachment != AttachmentKind::Image {
            return Ok(false);
        }
        let Some(file_id) = env.attachment_file_id.as_deref() else {
            return Ok(false);
        };

        let chat_id = ChatId(env.chat_id);
        let reply = ReplyParameters::new(MessageId(env.message_id));
        let question = question(&self.trigger, &env.raw_text);

        let state = self.chat_state.get(env.chat_id).await?;
        let system = system_prompt(state.persona, state.pro_mode);

        let answer = match download_file(&self.bot, &self.http, &self.token, file_id).await {
            Ok(bytes) => self
                .gemini
                .ask_vision(&system, &question, &bytes, "image/jpeg")
                .await
                .map_err(anyhow::Error::from),
            Err(err) => Err(err),
        };

        match answer {
            Ok(text) => {
                self.bot
                    .send_message(chat_id, text)
                    .reply_parameters(reply)
                    .await?;
            }
            Err(err) => {
                warn!("vision failed for chat {}: {:#}", env.chat_id, err);
                self.bot
                    .send_message(chat_id, "Maaf, gambarnya tidak bisa kubaca sekarang.")
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
    use crate::router::matcher::build_trigger_regex;

    #[test]
    fn test_question_strips_trigger() {
        let trigger = build_trigger_regex("elaina");
        assert_eq!(question(&trigger, "elaina ini dimana ya?"), "ini dimana ya?");
    }

    #[test]
    fn test_empty_caption_asks_for_description() {
        let trigger = build_trigger_regex("elaina");
        assert_eq!(question(&trigger, ""), DEFAULT_QUESTION);
        assert_eq!(question(&trigger, "elaina"), DEFAULT_QUESTION);
    }
}
