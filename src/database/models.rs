//! Persistent data models.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Persona used by the conversational fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    #[default]
    Elaina1,
    Elaina2,
}

impl Persona {
    /// Parse user input. Accepts short forms "1" and "2".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "1" | "elaina1" => Some(Self::Elaina1),
            "2" | "elaina2" => Some(Self::Elaina2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elaina1 => "elaina1",
            Self::Elaina2 => "elaina2",
        }
    }
}

/// Per-chat persona and mode state.
/// Mutated only by explicit owner/admin commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatState {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub chat_id: i64,

    #[serde(default)]
    pub persona: Persona,

    #[serde(default)]
    pub pro_mode: bool,

    #[serde(default)]
    pub updated_at: i64,
}

impl ChatState {
    pub fn new(chat_id: i64) -> Self {
        Self {
            id: None,
            chat_id,
            persona: Persona::default(),
            pro_mode: false,
            updated_at: 0,
        }
    }
}

/// Per-group moderation state. Rules are synced from the group description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeraturanState {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub chat_id: i64,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub rules: String,

    #[serde(default)]
    pub updated_at: i64,
}

impl PeraturanState {
    pub fn new(chat_id: i64) -> Self {
        Self {
            id: None,
            chat_id,
            enabled: false,
            rules: String::new(),
            updated_at: 0,
        }
    }

    /// Moderation never evaluates a message unless enabled with non-empty rules.
    pub fn ready(&self) -> bool {
        self.enabled && !self.rules.trim().is_empty()
    }
}

/// Warning ledger entry, keyed by (group, user).
///
/// `count` stays within 0..=limit: incremented on confirmed violations,
/// decremented (floor 0) on confirmed redeems, reset to 0 after removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarnRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub chat_id: i64,
    pub user_id: i64,

    #[serde(default)]
    pub count: i64,

    #[serde(default)]
    pub last_reason: String,

    #[serde(default)]
    pub updated_at: i64,
}

/// One turn of conversation memory for the fallback responder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryTurn {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub chat_id: i64,

    /// "user" or "assistant".
    pub role: String,

    pub text: String,
    pub ts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_parse() {
        assert_eq!(Persona::parse("elaina1"), Some(Persona::Elaina1));
        assert_eq!(Persona::parse("ELAINA2"), Some(Persona::Elaina2));
        assert_eq!(Persona::parse("1"), Some(Persona::Elaina1));
        assert_eq!(Persona::parse("2"), Some(Persona::Elaina2));
        assert_eq!(Persona::parse("elaina3"), None);
    }

    #[test]
    fn test_peraturan_ready() {
        let mut state = PeraturanState::new(1);
        assert!(!state.ready());

        state.enabled = true;
        assert!(!state.ready());

        state.rules = "  \n ".to_string();
        assert!(!state.ready());

        state.rules = "1. Dilarang spam".to_string();
        assert!(state.ready());
    }
}
