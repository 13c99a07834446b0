//! Message routing core.
//!
//! - `envelope` - normalizes inbound messages into a uniform struct
//! - `matcher` - pure command/trigger classification
//! - `gate` - per-message permissions for handler categories
//! - `chain` - the ordered, first-claim-wins handler chain
//!
//! `Router::dispatch` ties them together: explicit commands run first, then
//! the gating policy (which may silence the message entirely), then the
//! moderation side-channel, then the handler chain, then the conversational
//! fallback.

pub mod chain;
pub mod envelope;
pub mod gate;
pub mod matcher;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error};

use crate::handlers::commands::Commands;
use crate::handlers::fallback::FallbackResponder;
use crate::moderation::ModerationEngine;
use chain::HandlerChain;
use envelope::{ChatKind, MessageEnvelope};
use matcher::Classification;

/// Cue words meaning "answer the quoted message itself".
static REPLY_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(balas(in|lah)?|reply|jawab(in|lah)?)(\s+ini)?\b").expect("valid reply cue regex")
});

/// The dispatcher. Holds no mutable state beyond its static handler list, so
/// it is safe to invoke concurrently for distinct messages.
pub struct Router {
    commands: Commands,
    chain: HandlerChain,
    fallback: FallbackResponder,
    moderation: Option<Arc<ModerationEngine>>,
    trigger: Regex,
    prefix: char,
    moderation_timeout: Duration,
}

impl Router {
    pub fn new(
        commands: Commands,
        chain: HandlerChain,
        fallback: FallbackResponder,
        moderation: Option<Arc<ModerationEngine>>,
        trigger: Regex,
        prefix: char,
        moderation_timeout: Duration,
    ) -> Self {
        Self {
            commands,
            chain,
            fallback,
            moderation,
            trigger,
            prefix,
            moderation_timeout,
        }
    }

    /// Process one inbound envelope end to end.
    pub async fn dispatch(&self, env: MessageEnvelope) -> Result<()> {
        let cls = matcher::classify(&env.raw_text, self.prefix, &self.trigger);

        // Explicit commands (help, whoami, persona, peraturan) run before
        // anything else. Unrecognized commands fall through to the chain.
        if cls.is_command && self.commands.handle(&env, &cls).await? {
            return Ok(());
        }

        let gate = gate::gate(&env, &cls);
        if gate.nothing_allowed() {
            debug!(
                "chat {}: bare reply without command or trigger, ignoring",
                env.chat_id
            );
            return Ok(());
        }

        // Moderation runs as a side-channel, independent of the claim chain.
        // A slow judgment must never hold up dispatch. Recognized commands
        // returned above; everything else, prefixed or not, gets judged.
        if let Some(engine) = &self.moderation {
            if needs_moderation(&env) {
                let engine = Arc::clone(engine);
                let mod_env = env.clone();
                let timeout = self.moderation_timeout;
                tokio::spawn(async move {
                    match tokio::time::timeout(timeout, engine.evaluate_message(&mod_env)).await {
                        Ok(Err(err)) => error!("moderation evaluation failed: {:#}", err),
                        Err(_) => error!("moderation evaluation timed out"),
                        Ok(Ok(())) => {}
                    }
                });
            }
        }

        if self.chain.run(&env, &gate).await? {
            return Ok(());
        }

        if gate.allow_fallback {
            if let Some(prompt) = build_prompt(&env, &cls, &self.trigger) {
                self.fallback.respond(&env, &prompt).await?;
            }
        }

        Ok(())
    }
}

/// Whether the moderation side-channel sees this message: any group text,
/// including unrecognized prefixed commands. A prefix character is not an
/// exemption from the rules.
pub fn needs_moderation(env: &MessageEnvelope) -> bool {
    env.chat_kind == ChatKind::Group && !env.raw_text.trim().is_empty()
}

/// Derive the prompt for the fallback responder.
///
/// The raw text is never mutated: trigger tokens are stripped from a copy,
/// and quoted text is merged in when the message is a triggered reply. A
/// trigger-only reply (or one carrying a reply cue) means "answer the quoted
/// message"; otherwise the quoted text becomes context below the instruction.
pub fn build_prompt(env: &MessageEnvelope, cls: &Classification, trigger: &Regex) -> Option<String> {
    let quoted_text = env
        .quoted
        .as_ref()
        .map(|q| q.text.trim())
        .filter(|t| !t.is_empty());

    let text = if let Some(quoted) = quoted_text {
        if cls.has_trigger {
            let after = trigger.replace_all(&env.raw_text, "");
            let after = after.trim();
            if after.is_empty() || REPLY_CUE.is_match(after) {
                quoted.to_string()
            } else {
                format!("{}\n\nKonteks (pesan yang di-reply): {}", after, quoted)
            }
        } else {
            env.raw_text.clone()
        }
    } else if env.chat_kind == ChatKind::Group {
        let clean = trigger.replace_all(&env.raw_text, "");
        let clean = clean.trim();
        if clean.is_empty() {
            env.raw_text.clone()
        } else {
            clean.to_string()
        }
    } else {
        env.raw_text.clone()
    };

    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::envelope::{AttachmentKind, Quoted};
    use crate::router::matcher::{build_trigger_regex, classify};

    fn group_env(text: &str) -> MessageEnvelope {
        MessageEnvelope {
            chat_id: -100,
            chat_kind: ChatKind::Group,
            message_id: 1,
            sender_id: 7,
            sender_name: "Tester".to_string(),
            raw_text: text.to_string(),
            attachment: AttachmentKind::None,
            attachment_file_id: None,
            quoted: None,
        }
    }

    #[test]
    fn test_prompt_strips_trigger_in_group() {
        let trigger = build_trigger_regex("elaina");
        let env = group_env("elaina ceritakan sesuatu");
        let cls = classify(&env.raw_text, '!', &trigger);

        assert_eq!(
            build_prompt(&env, &cls, &trigger).as_deref(),
            Some("ceritakan sesuatu")
        );
    }

    #[test]
    fn test_prompt_trigger_only_reply_uses_quoted_text() {
        let trigger = build_trigger_regex("elaina");
        let mut env = group_env("elaina");
        env.quoted = Some(Quoted {
            text: "besok libur nggak?".to_string(),
            attachment: AttachmentKind::None,
            sender_id: None,
        });
        let cls = classify(&env.raw_text, '!', &trigger);

        assert_eq!(
            build_prompt(&env, &cls, &trigger).as_deref(),
            Some("besok libur nggak?")
        );
    }

    #[test]
    fn test_prompt_reply_with_instruction_keeps_both() {
        let trigger = build_trigger_regex("elaina");
        let mut env = group_env("elaina apa maksudnya?");
        env.quoted = Some(Quoted {
            text: "lorem ipsum".to_string(),
            attachment: AttachmentKind::None,
            sender_id: None,
        });
        let cls = classify(&env.raw_text, '!', &trigger);

        let prompt = build_prompt(&env, &cls, &trigger).unwrap();
        assert!(prompt.starts_with("apa maksudnya?"));
        assert!(prompt.contains("Konteks (pesan yang di-reply): lorem ipsum"));
    }

    #[test]
    fn test_moderation_covers_prefixed_text() {
        // A violating message does not escape judgment by wearing a
        // command prefix.
        assert!(needs_moderation(&group_env("!x beli followers murah")));
        assert!(needs_moderation(&group_env("halo semua")));
    }

    #[test]
    fn test_moderation_skips_direct_and_empty() {
        let mut env = group_env("halo");
        env.chat_kind = ChatKind::Direct;
        assert!(!needs_moderation(&env));
        assert!(!needs_moderation(&group_env("   ")));
    }

    #[test]
    fn test_prompt_empty_text_yields_none() {
        let trigger = build_trigger_regex("elaina");
        let env = group_env("   ");
        let cls = classify(&env.raw_text, '!', &trigger);

        assert_eq!(build_prompt(&env, &cls, &trigger), None);
    }
}
