//! Group moderation: rules storage, warning ledger and escalation.
//!
//! - `judgment` - the external judgment collaborator (Gemini) behind a trait
//! - `command` - the explicit `!peraturan` command set
//! - `engine` - the warn/redeem state machine
//! - `transport` - the chat-side operations behind a trait

pub mod command;
pub mod engine;
pub mod judgment;
pub mod transport;

pub use command::PeraturanCommand;
pub use engine::{ModerationEngine, ModerationStore, RedeemDetector};
pub use judgment::{GeminiJudge, Judge, Judgment, JudgmentInput, JudgmentMode};
pub use transport::{ModerationTransport, TelegramModeration};
