//! Admin checking with caching.
//!
//! Moderation commands are admin/owner only; the admin list per chat is
//! cached briefly to avoid a getChatAdministrators call per command.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use moka::sync::Cache;
use teloxide::prelude::*;
use teloxide::types::{ChatId, UserId};
use tracing::debug;

/// Permission checker with a short-lived admin cache.
#[derive(Clone)]
pub struct Permissions {
    bot: Bot,
    admins: Cache<i64, Arc<Vec<u64>>>,
    owner_ids: Arc<Vec<u64>>,
}

impl Permissions {
    pub fn new(bot: Bot, owner_ids: Vec<u64>) -> Self {
        Self {
            bot,
            admins: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(Duration::from_secs(300))
                .build(),
            owner_ids: Arc::new(owner_ids),
        }
    }

    /// Check if a user is a bot owner (bypasses all restrictions).
    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owner_ids.contains(&user_id)
    }

    /// Check if a user is a group admin or a bot owner.
    pub async fn is_admin(&self, chat_id: ChatId, user_id: UserId) -> Result<bool> {
        if self.is_owner(user_id.0) {
            return Ok(true);
        }

        if let Some(ids) = self.admins.get(&chat_id.0) {
            return Ok(ids.contains(&user_id.0));
        }

        let members = self.bot.get_chat_administrators(chat_id).await?;
        let ids: Arc<Vec<u64>> = Arc::new(members.iter().map(|m| m.user.id.0).collect());
        debug!("Cached {} admins for chat {}", ids.len(), chat_id);
        self.admins.insert(chat_id.0, ids.clone());

        Ok(ids.contains(&user_id.0))
    }

    /// Drop the cached admin list for a chat.
    #[allow(dead_code)]
    pub fn invalidate(&self, chat_id: ChatId) {
        self.admins.invalidate(&chat_id.0);
    }
}
