//! Conversation memory for the fallback responder.
//!
//! Stores the last turns per chat; `build_context` folds them into the prompt
//! under a character budget, oldest first.

use anyhow::Result;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::Collection;

use crate::database::models::MemoryTurn;
use crate::database::Database;

/// Repository for conversation turns.
pub struct MemoryRepo {
    collection: Collection<MemoryTurn>,
}

impl MemoryRepo {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("chat_memory"),
        }
    }

    /// Persist one turn. Blank text is silently skipped.
    pub async fn save_turn(&self, chat_id: i64, role: &str, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let turn = MemoryTurn {
            id: None,
            chat_id,
            role: role.to_string(),
            text: text.to_string(),
            ts: chrono::Utc::now().timestamp_millis(),
        };
        self.collection.insert_one(turn).await?;
        Ok(())
    }

    /// Load the last `turns` user+assistant pairs, oldest first.
    pub async fn load_recent(&self, chat_id: i64, turns: usize) -> Result<Vec<MemoryTurn>> {
        if turns == 0 {
            return Ok(Vec::new());
        }
        let filter = doc! { "chat_id": chat_id };
        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "ts": -1 })
            .limit((turns * 2) as i64)
            .await?;

        let mut recent: Vec<MemoryTurn> = cursor.try_collect().await?;
        recent.reverse();
        Ok(recent)
    }
}

/// Fold history and the new message into a single prompt.
///
/// History is trimmed from the oldest end until it fits the budget; the
/// current message is always included.
pub fn build_context(history: &[MemoryTurn], current: &str, char_budget: usize) -> String {
    if history.is_empty() {
        return current.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut used = 0usize;
    for turn in history.iter().rev() {
        let prefix = if turn.role == "assistant" { "Asisten" } else { "User" };
        let line = format!("{}: {}", prefix, turn.text.trim());
        if used + line.len() > char_budget {
            break;
        }
        used += line.len();
        lines.push(line);
    }

    if lines.is_empty() {
        return current.to_string();
    }
    lines.reverse();

    format!(
        "Riwayat percakapan sebelumnya:\n{}\n\nPesan baru:\n{}",
        lines.join("\n"),
        current
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, text: &str, ts: i64) -> MemoryTurn {
        MemoryTurn {
            id: None,
            chat_id: 1,
            role: role.to_string(),
            text: text.to_string(),
            ts,
        }
    }

    #[test]
    fn test_build_context_empty_history() {
        assert_eq!(build_context(&[], "halo", 4000), "halo");
    }

    #[test]
    fn test_build_context_includes_history() {
        let history = vec![turn("user", "siapa kamu?", 1), turn("assistant", "Aku Elaina.", 2)];
        let out = build_context(&history, "masih ingat aku?", 4000);

        assert!(out.contains("User: siapa kamu?"));
        assert!(out.contains("Asisten: Aku Elaina."));
        assert!(out.ends_with("masih ingat aku?"));
        // History must appear before the new message.
        assert!(out.find("siapa kamu").unwrap() < out.find("masih ingat").unwrap());
    }

    #[test]
    fn test_build_context_budget_drops_oldest() {
        let history = vec![
            turn("user", &"a".repeat(300), 1),
            turn("assistant", &"b".repeat(300), 2),
            turn("user", "terbaru", 3),
        ];
        let out = build_context(&history, "pesan", 350);

        assert!(out.contains("terbaru"));
        assert!(!out.contains(&"a".repeat(300)));
    }
}
