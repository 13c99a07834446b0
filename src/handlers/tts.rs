//! Voice note handler.
//!
//! A triggered message asking for a voice note ("vn") gets a short script
//! from the text model, synthesized through ElevenLabs and sent back as a
//! Telegram voice message.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, MessageId, ReplyParameters};
use tracing::{info, warn};

use crate::bot::ElainaBot;
use crate::database::ChatStateRepo;
use crate::llm::{system_prompt, GeminiClient};
use crate::router::chain::{Handler, HandlerCategory};
use crate::router::envelope::MessageEnvelope;

const ELEVEN_API: &str = "https://api.elevenlabs.io/v1/text-to-speech";

static VN_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(vn|voice\s*note|pesan\s+suara)\b").expect("valid voice note cue regex")
});

pub struct TtsHandler {
    bot: ElainaBot,
    gemini: Arc<GeminiClient>,
    chat_state: Arc<ChatStateRepo>,
    http: reqwest::Client,
    api_key: String,
    voice_id: String,
    max_words: usize,
}

impl TtsHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bot: ElainaBot,
        gemini: Arc<GeminiClient>,
        chat_state: Arc<ChatStateRepo>,
        http: reqwest::Client,
        api_key: String,
        voice_id: String,
        max_words: usize,
    ) -> Self {
        Self {
            bot,
            gemini,
            chat_state,
            http,
            api_key,
            voice_id,
            max_words,
        }
    }

    async fn synthesize(&self, script: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", ELEVEN_API, self.voice_id);
        let body = json!({
            "text": script,
            "model_id": "eleven_multilingual_v2",
        });

        let resp = self
            .http
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("elevenlabs request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("elevenlabs returned status {}: {}", status, body);
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Handler for TtsHandler {
    fn name(&self) -> &'static str {
        "tts"
    }

    fn category(&self) -> HandlerCategory {
        HandlerCategory::Text
    }

    async fn try_handle(&self, env: &MessageEnvelope) -> Result<bool> {
        if !VN_CUE.is_match(&env.raw_text) {
            return Ok(false);
        }

        let chat_id = ChatId(env.chat_id);
        let reply = ReplyParameters::new(MessageId(env.message_id));
        let topic = VN_CUE.replace_all(&env.raw_text, "").trim().to_string();

        info!("chat {}: voice note requested", env.chat_id);

        let state = self.chat_state.get(env.chat_id).await?;
        let system = format!(
            "{}\nTulis naskah pendek untuk voice note, maksimal {} kata, \
             bahasa lisan yang natural, tanpa emoji dan tanpa format apa pun.",
            system_prompt(state.persona, state.pro_mode),
            self.max_words,
        );
        let topic = if topic.is_empty() {
            "Sapa pendengarnya dengan hangat.".to_string()
        } else {
            topic
        };

        let voice = match self.gemini.ask_text(&system, &topic).await {
            Ok(script) => {
                let script = clamp_words(&script, self.max_words);
                self.synthesize(&script).await
            }
            Err(err) => Err(err.into()),
        };

        match voice {
            Ok(bytes) => {
                self.bot
                    .send_voice(chat_id, InputFile::memory(bytes).file_name("elaina.ogg"))
                    .reply_parameters(reply)
                    .await?;
            }
            Err(err) => {
                warn!("voice note failed for chat {}: {:#}", env.chat_id, err);
                self.bot
                    .send_message(chat_id, "Maaf, suaraku lagi serak. Coba lagi nanti ya.")
                    .reply_parameters(reply)
                    .await?;
            }
        }

        Ok(true)
    }
}

/// Hard cap on the script length; the model does not always respect the
/// word budget in the prompt.
fn clamp_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.trim().to_string();
    }
    words[..max_words].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_detection() {
        assert!(VN_CUE.is_match("elaina vn dong"));
        assert!(VN_CUE.is_match("kirim voice note tentang hujan"));
        assert!(VN_CUE.is_match("pesan suara buat aku"));
        assert!(!VN_CUE.is_match("elaina ceritain sesuatu"));
        assert!(!VN_CUE.is_match("kevin datang"));
    }

    #[test]
    fn test_clamp_words() {
        assert_eq!(clamp_words("satu dua tiga", 5), "satu dua tiga");
        assert_eq!(clamp_words("satu dua tiga empat", 2), "satu dua");
    }
}
