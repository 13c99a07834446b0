//! Chat-side operations of the moderation engine.
//!
//! The engine reaches the group through this narrow trait, same seam as
//! `Judge`: the production implementation wraps the throttled bot, tests
//! use recording stubs.

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode, ReplyParameters, UserId};
use tracing::warn;

use crate::bot::ElainaBot;
use crate::permissions::Permissions;

#[async_trait]
pub trait ModerationTransport: Send + Sync {
    /// Remove a message.
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()>;

    /// Send an HTML notice, optionally as a reply.
    async fn send_notice(&self, chat_id: i64, reply_to: Option<i32>, html: &str) -> Result<()>;

    /// Remove a member from the group, leaving them free to be re-invited.
    async fn kick_member(&self, chat_id: i64, user_id: u64) -> Result<()>;

    /// Current group description.
    async fn group_description(&self, chat_id: i64) -> Result<Option<String>>;

    async fn is_admin(&self, chat_id: i64, user_id: u64) -> Result<bool>;
}

/// Production transport: the throttled bot plus the cached admin checker.
pub struct TelegramModeration {
    bot: ElainaBot,
    permissions: Permissions,
}

impl TelegramModeration {
    pub fn new(bot: ElainaBot, permissions: Permissions) -> Self {
        Self { bot, permissions }
    }
}

#[async_trait]
impl ModerationTransport for TelegramModeration {
    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await?;
        Ok(())
    }

    async fn send_notice(&self, chat_id: i64, reply_to: Option<i32>, html: &str) -> Result<()> {
        let mut req = self
            .bot
            .send_message(ChatId(chat_id), html)
            .parse_mode(ParseMode::Html);
        if let Some(id) = reply_to {
            req = req.reply_parameters(ReplyParameters::new(MessageId(id)));
        }
        req.await?;
        Ok(())
    }

    async fn kick_member(&self, chat_id: i64, user_id: u64) -> Result<()> {
        // Ban-then-unban: the member is out but may be re-invited.
        self.bot
            .ban_chat_member(ChatId(chat_id), UserId(user_id))
            .await?;
        if let Err(err) = self
            .bot
            .unban_chat_member(ChatId(chat_id), UserId(user_id))
            .await
        {
            warn!("chat {}: unban after kick failed: {}", chat_id, err);
        }
        Ok(())
    }

    async fn group_description(&self, chat_id: i64) -> Result<Option<String>> {
        let chat = self.bot.get_chat(ChatId(chat_id)).await?;
        Ok(chat.description().map(|d| d.to_string()))
    }

    async fn is_admin(&self, chat_id: i64, user_id: u64) -> Result<bool> {
        self.permissions
            .is_admin(ChatId(chat_id), UserId(user_id))
            .await
    }
}
