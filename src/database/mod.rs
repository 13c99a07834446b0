//! Database module exports.

mod chat_state;
mod memory;
mod models;
mod moderation;
mod mongo;

pub use chat_state::ChatStateRepo;
pub use memory::{build_context, MemoryRepo};
pub use models::*;
pub use moderation::ModerationRepo;
pub use mongo::Database;
