//! Conversational fallback responder.
//!
//! Runs only when no chain handler claimed the message and gating allowed a
//! fallback. Persona and pro mode come from the per-chat state; recent turns
//! are folded into the prompt and both sides of the exchange are persisted
//! afterwards.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ReplyParameters};
use tracing::warn;

use crate::bot::ElainaBot;
use crate::database::{build_context, ChatStateRepo, MemoryRepo};
use crate::llm::{system_prompt, GeminiClient};
use crate::router::envelope::MessageEnvelope;

// Telegram caps messages at 4096 chars; leave headroom.
const REPLY_MAX_CHARS: usize = 4000;

pub struct FallbackResponder {
    bot: ElainaBot,
    gemini: Arc<GeminiClient>,
    chat_state: Arc<ChatStateRepo>,
    memory: Arc<MemoryRepo>,
    memory_turns: usize,
    char_budget: usize,
}

impl FallbackResponder {
    pub fn new(
        bot: ElainaBot,
        gemini: Arc<GeminiClient>,
        chat_state: Arc<ChatStateRepo>,
        memory: Arc<MemoryRepo>,
        memory_turns: usize,
        char_budget: usize,
    ) -> Self {
        Self {
            bot,
            gemini,
            chat_state,
            memory,
            memory_turns,
            char_budget,
        }
    }

    /// Answer one message. The prompt has already been derived by the
    /// router (trigger stripped, quoted text merged).
    pub async fn respond(&self, env: &MessageEnvelope, prompt: &str) -> Result<()> {
        let chat_id = ChatId(env.chat_id);
        let reply = ReplyParameters::new(MessageId(env.message_id));

        let state = self.chat_state.get(env.chat_id).await?;
        let history = self
            .memory
            .load_recent(env.chat_id, self.memory_turns)
            .await
            .unwrap_or_default();

        let system = system_prompt(state.persona, state.pro_mode);
        let user = build_context(&history, prompt, self.char_budget);

        match self.gemini.ask_text(&system, &user).await {
            Ok(answer) => {
                let answer = truncate_chars(&answer, REPLY_MAX_CHARS);
                self.bot
                    .send_message(chat_id, &answer)
                    .reply_parameters(reply)
                    .await?;

                // Memory write failures must not surface to the user.
                if let Err(err) = self.memory.save_turn(env.chat_id, "user", prompt).await {
                    warn!("saving user turn failed: {:#}", err);
                }
                if let Err(err) = self.memory.save_turn(env.chat_id, "assistant", &answer).await {
                    warn!("saving assistant turn failed: {:#}", err);
                }
            }
            Err(err) => {
                warn!("fallback response failed for chat {}: {}", env.chat_id, err);
                self.bot
                    .send_message(chat_id, "Maaf, aku lagi susah mikir. Coba lagi sebentar lagi ya.")
                    .reply_parameters(reply)
                    .await?;
            }
        }

        Ok(())
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}
