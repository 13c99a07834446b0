//! Configuration module for the Elaina bot.
//!
//! Loads configuration from environment variables.

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,

    /// Owner user IDs (comma-separated)
    /// These users have full access to all bot features.
    pub owner_ids: Vec<u64>,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    /// Display name used in persona prompts and moderation notices.
    pub bot_name: String,

    /// Trigger word that authorizes non-command features in groups.
    /// Matched case-insensitively on word boundaries.
    pub trigger: String,

    /// Single reserved prefix character for explicit commands.
    pub command_prefix: char,

    /// Warnings before a member is removed from the group.
    pub warn_limit: i64,

    /// Gemini API keys, rotated on failure.
    pub gemini_keys: Vec<String>,

    /// Separate API key for the moderation judgment model.
    /// Moderation commands refuse to run without it.
    pub moderation_api_key: Option<String>,

    /// Override for the moderation system prompt.
    pub moderation_prompt: Option<String>,

    /// Extra phrases that count as a redeem request (comma-separated).
    pub redeem_keywords: Vec<String>,

    // ElevenLabs (voice notes)
    pub eleven_api_key: Option<String>,
    pub eleven_voice: String,
    pub vn_max_words: usize,

    // Conversation memory
    pub memory_turns: usize,
    pub memory_char_budget: usize,

    /// Upper bound for slow external calls inside handlers (seconds).
    pub handler_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if required environment variables are not set.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        // Parse owner IDs
        let owner_ids = env::var("OWNER_IDS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse::<u64>().ok())
            .collect();

        // GEMINI_API_KEYS (comma separated) or a single GEMINI_API_KEY
        let keys_env = env::var("GEMINI_API_KEYS")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .expect("GEMINI_API_KEYS or GEMINI_API_KEY must be set");
        let gemini_keys: Vec<String> = keys_env
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        assert!(!gemini_keys.is_empty(), "GEMINI_API_KEYS is empty");

        let command_prefix = env::var("COMMAND_PREFIX")
            .ok()
            .and_then(|s| s.trim().chars().next())
            .unwrap_or('!');

        Self {
            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN must be set"),
            owner_ids,
            mongodb_uri: env::var("MONGODB_URI").expect("MONGODB_URI must be set"),
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "elaina".to_string()),
            bot_name: env::var("BOT_NAME").unwrap_or_else(|_| "Elaina".to_string()),
            trigger: env::var("TRIGGER")
                .map(|s| s.trim().to_lowercase())
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "elaina".to_string()),
            command_prefix,
            warn_limit: parse_or("WARN_LIMIT", 5).clamp(1, 100),
            gemini_keys,
            moderation_api_key: env::var("PERATURAN_APIKEY")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            moderation_prompt: env::var("PERATURAN_PROMPT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            redeem_keywords: env::var("REDEEM_KEYWORDS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            eleven_api_key: env::var("ELEVENLABS_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            eleven_voice: env::var("ELEVENLABS_VOICE_ID")
                .unwrap_or_else(|_| "iWydkXKoiVtvdn4vLKp9".to_string()),
            vn_max_words: parse_or("VN_MAX_WORDS", 80) as usize,
            memory_turns: (parse_or("MEMORY_TURNS", 8) as usize).min(30),
            memory_char_budget: (parse_or("MEMORY_CHAR_BUDGET", 4000) as usize)
                .clamp(500, 20_000),
            handler_timeout_secs: parse_or("HANDLER_TIMEOUT_SECS", 40) as u64,
        }
    }
}

fn parse_or(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
