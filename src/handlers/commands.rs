//! Explicit prefix commands.
//!
//! These run before the gating policy and the chain: a recognized command
//! always answers, whatever chat it arrives in. Unrecognized commands fall
//! through so content-pattern handlers (like `!gambar`) can pick them up.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode, ReplyParameters};

use crate::bot::ElainaBot;
use crate::database::{ChatStateRepo, Persona};
use crate::moderation::ModerationEngine;
use crate::router::envelope::MessageEnvelope;
use crate::router::matcher::Classification;
use crate::utils::html_escape;

pub struct Commands {
    bot: ElainaBot,
    chat_state: Arc<ChatStateRepo>,
    moderation: Option<Arc<ModerationEngine>>,
    trigger: String,
    prefix: char,
}

impl Commands {
    pub fn new(
        bot: ElainaBot,
        chat_state: Arc<ChatStateRepo>,
        moderation: Option<Arc<ModerationEngine>>,
        trigger: String,
        prefix: char,
    ) -> Self {
        Self {
            bot,
            chat_state,
            moderation,
            trigger,
            prefix,
        }
    }

    /// Dispatch a classified command. Returns whether it was recognized and
    /// answered.
    pub async fn handle(&self, env: &MessageEnvelope, cls: &Classification) -> Result<bool> {
        match cls.command.as_str() {
            "help" => {
                self.reply(env, &help_text(self.prefix, &self.trigger)).await?;
                Ok(true)
            }
            "whoami" => {
                let text = format!(
                    "Nama: {}\nUser ID: <code>{}</code>\nChat ID: <code>{}</code>",
                    html_escape(&env.sender_name),
                    env.sender_id,
                    env.chat_id,
                );
                self.reply(env, &text).await?;
                Ok(true)
            }
            "peraturan" => {
                match &self.moderation {
                    Some(engine) => engine.handle_command(env, &cls.args).await?,
                    None => {
                        self.reply(env, "Moderasi tidak tersedia: PERATURAN_APIKEY belum diatur.")
                            .await?;
                    }
                }
                Ok(true)
            }
            cmd if cmd == self.trigger => {
                self.handle_persona(env, &cls.args).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// `!elaina persona <nama>` and `!elaina mode pro on|off`.
    async fn handle_persona(&self, env: &MessageEnvelope, args: &str) -> Result<()> {
        let words: Vec<&str> = args.split_whitespace().collect();

        match words.as_slice() {
            ["persona", name] => match Persona::parse(name) {
                Some(persona) => {
                    self.chat_state.set_persona(env.chat_id, persona).await?;
                    self.reply(env, &format!("Persona diganti ke {}.", persona.as_str()))
                        .await
                }
                None => {
                    self.reply(env, "Persona tidak dikenal. Pilihan: elaina1, elaina2.")
                        .await
                }
            },
            ["mode", "pro", flag @ ("on" | "off")] => {
                let on = *flag == "on";
                self.chat_state.set_pro(env.chat_id, on).await?;
                self.reply(
                    env,
                    if on {
                        "Mode pro aktif: kedua persona dipakai bersamaan."
                    } else {
                        "Mode pro dimatikan."
                    },
                )
                .await
            }
            _ => {
                let usage = format!(
                    "Gunakan: {p}{t} persona elaina1|elaina2, atau {p}{t} mode pro on|off",
                    p = self.prefix,
                    t = self.trigger,
                );
                self.reply(env, &usage).await
            }
        }
    }

    async fn reply(&self, env: &MessageEnvelope, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(env.chat_id), text)
            .parse_mode(ParseMode::Html)
            .reply_parameters(ReplyParameters::new(MessageId(env.message_id)))
            .await?;
        Ok(())
    }
}

fn help_text(prefix: char, trigger: &str) -> String {
    format!(
        "<b>Perintah:</b>\n\
         {p}help - daftar perintah\n\
         {p}whoami - info akunmu\n\
         {p}gambar &lt;deskripsi&gt; - buat gambar\n\
         {p}{t} persona elaina1|elaina2 - ganti persona\n\
         {p}{t} mode pro on|off - mode pro\n\
         {p}peraturan on|off|sync|status|rules|clear - moderasi grup\n\n\
         Di grup, sebut \"{t}\" supaya aku menjawab. Kirim link TikTok untuk \
         mengunduh videonya, kirim foto untuk kujelaskan, atau minta \"vn\" \
         untuk pesan suara.",
        p = prefix,
        t = trigger,
    )
}
