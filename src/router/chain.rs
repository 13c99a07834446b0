//! The ordered handler chain: first handler to claim a message wins.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, error};

use super::envelope::MessageEnvelope;
use super::gate::GatingDecision;

/// Gating category of a handler, checked before `try_handle` is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerCategory {
    /// Content-pattern features allowed in groups without a trigger.
    Priority,
    /// Ordinary text features.
    Text,
    /// Features consuming an image or video.
    Media,
}

/// One feature in the chain.
///
/// `try_handle` returns `Ok(true)` when the message is claimed; any
/// user-visible reply, including an apology for a failed downstream call,
/// counts as a claim so the chain never produces a second response. An `Err`
/// means the handler failed before sending anything; the chain logs it and
/// moves on.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> HandlerCategory;

    async fn try_handle(&self, env: &MessageEnvelope) -> Result<bool>;
}

/// Fixed-order list of handlers, configured once at startup.
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerChain {
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self { handlers }
    }

    /// Run the chain. Returns whether some handler claimed the message.
    pub async fn run(&self, env: &MessageEnvelope, gate: &GatingDecision) -> Result<bool> {
        for handler in &self.handlers {
            if !gate.allows(handler.category()) {
                debug!("handler {} skipped by gating", handler.name());
                continue;
            }

            match handler.try_handle(env).await {
                Ok(true) => {
                    debug!("handler {} claimed message {}", handler.name(), env.message_id);
                    return Ok(true);
                }
                Ok(false) => {}
                Err(err) => {
                    error!("handler {} failed before responding: {:#}", handler.name(), err);
                }
            }
        }

        Ok(false)
    }
}
