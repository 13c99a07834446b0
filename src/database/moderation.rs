//! Moderation repository: group rules and the warning ledger.
//!
//! Rules are read on every group message while moderation is enabled, so they
//! sit behind a short-lived cache. Warn counts are never cached: increments go
//! through atomic `$inc` upserts so two violating messages arriving
//! concurrently cannot lose an update.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions};
use mongodb::Collection;
use moka::sync::Cache;
use tracing::{debug, info};

use crate::database::models::{PeraturanState, WarnRecord};
use crate::database::Database;
use crate::moderation::ModerationStore;

/// Repository for moderation state.
pub struct ModerationRepo {
    rules: Collection<PeraturanState>,
    warns: Collection<WarnRecord>,
    rules_cache: Cache<i64, PeraturanState>,
}

impl ModerationRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            rules: db.collection("peraturan"),
            warns: db.collection("warns"),
            rules_cache: Cache::builder()
                .max_capacity(3_000)
                .time_to_live(Duration::from_secs(120))
                .build(),
        }
    }

    /// Get moderation state for a group, defaulting to disabled.
    pub async fn get_rules(&self, chat_id: i64) -> Result<PeraturanState> {
        if let Some(state) = self.rules_cache.get(&chat_id) {
            return Ok(state);
        }

        let filter = doc! { "chat_id": chat_id };
        let state = self
            .rules
            .find_one(filter)
            .await?
            .unwrap_or_else(|| PeraturanState::new(chat_id));

        self.rules_cache.insert(chat_id, state.clone());
        Ok(state)
    }

    /// Overwrite enabled flag and rules text for a group.
    pub async fn set_rules(&self, chat_id: i64, enabled: bool, rules: &str) -> Result<()> {
        let filter = doc! { "chat_id": chat_id };
        let update = doc! {
            "$set": {
                "enabled": enabled,
                "rules": rules,
                "updated_at": chrono::Utc::now().timestamp(),
            },
        };
        let options = UpdateOptions::builder().upsert(true).build();

        self.rules
            .update_one(filter, update)
            .with_options(options)
            .await?;

        self.rules_cache.invalidate(&chat_id);
        info!("Moderation state for chat {}: enabled={}", chat_id, enabled);
        Ok(())
    }

    /// Atomically increment a user's warn count and return the new record.
    pub async fn add_warn(&self, chat_id: i64, user_id: i64, reason: &str) -> Result<WarnRecord> {
        let filter = doc! { "chat_id": chat_id, "user_id": user_id };
        let update = doc! {
            "$inc": { "count": 1 },
            "$set": {
                "last_reason": reason,
                "updated_at": chrono::Utc::now().timestamp(),
            },
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let record = self
            .warns
            .find_one_and_update(filter, update)
            .with_options(options)
            .await?
            .context("warn upsert returned no document")?;

        debug!(
            "Warn for user {} in chat {} is now {} ({})",
            user_id, chat_id, record.count, reason
        );
        Ok(record)
    }

    /// Decrement a user's warn count by exactly one, never below zero.
    ///
    /// Returns the remaining count, or `None` when the user had no warns to
    /// reduce. A record that reaches zero is removed from the ledger.
    pub async fn decrement_warn(&self, chat_id: i64, user_id: i64) -> Result<Option<i64>> {
        let filter = doc! { "chat_id": chat_id, "user_id": user_id, "count": { "$gt": 0 } };
        let update = doc! {
            "$inc": { "count": -1 },
            "$set": { "updated_at": chrono::Utc::now().timestamp() },
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let record = self
            .warns
            .find_one_and_update(filter, update)
            .with_options(options)
            .await?;

        match record {
            Some(rec) => {
                let remaining = rec.count.max(0);
                if remaining == 0 {
                    self.clear_warns(chat_id, user_id).await?;
                }
                debug!(
                    "Warn for user {} in chat {} reduced to {}",
                    user_id, chat_id, remaining
                );
                Ok(Some(remaining))
            }
            None => Ok(None),
        }
    }

    /// Remove a user's warn record entirely.
    pub async fn clear_warns(&self, chat_id: i64, user_id: i64) -> Result<()> {
        let filter = doc! { "chat_id": chat_id, "user_id": user_id };
        self.warns.delete_one(filter).await?;
        debug!("Warns cleared for user {} in chat {}", user_id, chat_id);
        Ok(())
    }

    /// List the highest warn counts in a group (for the status command).
    pub async fn list_warns(&self, chat_id: i64, limit: i64) -> Result<Vec<WarnRecord>> {
        let filter = doc! { "chat_id": chat_id, "count": { "$gt": 0 } };
        let cursor = self
            .warns
            .find(filter)
            .sort(doc! { "count": -1 })
            .limit(limit)
            .await?;

        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl ModerationStore for ModerationRepo {
    async fn get_rules(&self, chat_id: i64) -> Result<PeraturanState> {
        ModerationRepo::get_rules(self, chat_id).await
    }

    async fn set_rules(&self, chat_id: i64, enabled: bool, rules: &str) -> Result<()> {
        ModerationRepo::set_rules(self, chat_id, enabled, rules).await
    }

    async fn add_warn(&self, chat_id: i64, user_id: i64, reason: &str) -> Result<WarnRecord> {
        ModerationRepo::add_warn(self, chat_id, user_id, reason).await
    }

    async fn decrement_warn(&self, chat_id: i64, user_id: i64) -> Result<Option<i64>> {
        ModerationRepo::decrement_warn(self, chat_id, user_id).await
    }

    async fn clear_warns(&self, chat_id: i64, user_id: i64) -> Result<()> {
        ModerationRepo::clear_warns(self, chat_id, user_id).await
    }

    async fn list_warns(&self, chat_id: i64, limit: i64) -> Result<Vec<WarnRecord>> {
        ModerationRepo::list_warns(self, chat_id, limit).await
    }
}
