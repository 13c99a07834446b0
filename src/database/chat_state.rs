//! Chat state repository with on-demand caching.
//!
//! The fallback responder reads this on every message, so cache hits matter.

use std::time::Duration;

use anyhow::Result;
use mongodb::bson::doc;
use mongodb::options::UpdateOptions;
use mongodb::Collection;
use moka::sync::Cache;
use tracing::debug;

use crate::database::models::{ChatState, Persona};
use crate::database::Database;

/// Repository for per-chat persona/mode state.
pub struct ChatStateRepo {
    collection: Collection<ChatState>,
    cache: Cache<i64, ChatState>,
}

impl ChatStateRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("chat_state"),
            cache: Cache::builder()
                .max_capacity(5_000)
                .time_to_live(Duration::from_secs(600))
                .build(),
        }
    }

    /// Get chat state, falling back to defaults if not stored yet.
    pub async fn get(&self, chat_id: i64) -> Result<ChatState> {
        if let Some(state) = self.cache.get(&chat_id) {
            return Ok(state);
        }

        let filter = doc! { "chat_id": chat_id };
        let state = self
            .collection
            .find_one(filter)
            .await?
            .unwrap_or_else(|| ChatState::new(chat_id));

        self.cache.insert(chat_id, state.clone());
        Ok(state)
    }

    /// Set the persona, preserving pro_mode.
    pub async fn set_persona(&self, chat_id: i64, persona: Persona) -> Result<()> {
        let filter = doc! { "chat_id": chat_id };
        let update = doc! {
            "$set": {
                "persona": persona.as_str(),
                "updated_at": chrono::Utc::now().timestamp(),
            },
            "$setOnInsert": { "pro_mode": false },
        };
        let options = UpdateOptions::builder().upsert(true).build();

        self.collection
            .update_one(filter, update)
            .with_options(options)
            .await?;

        self.cache.invalidate(&chat_id);
        debug!("Persona for chat {} set to {}", chat_id, persona.as_str());
        Ok(())
    }

    /// Toggle pro mode, preserving the persona.
    pub async fn set_pro(&self, chat_id: i64, pro: bool) -> Result<()> {
        let filter = doc! { "chat_id": chat_id };
        let update = doc! {
            "$set": {
                "pro_mode": pro,
                "updated_at": chrono::Utc::now().timestamp(),
            },
            "$setOnInsert": { "persona": Persona::default().as_str() },
        };
        let options = UpdateOptions::builder().upsert(true).build();

        self.collection
            .update_one(filter, update)
            .with_options(options)
            .await?;

        self.cache.invalidate(&chat_id);
        debug!("Pro mode for chat {} set to {}", chat_id, pro);
        Ok(())
    }
}
