//! Bot module - Telegram wiring around the router.

pub mod dispatcher;
mod runtime;

pub use dispatcher::{build_dispatcher, ElainaBot};
pub use runtime::run;
