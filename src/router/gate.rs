//! Gating policy: which handler categories may run on this message.
//!
//! Computed once per message from chat kind, command/trigger flags and the
//! attachment. Rules are vetoes, applied in priority order.

use super::chain::HandlerCategory;
use super::envelope::{AttachmentKind, ChatKind, MessageEnvelope};
use super::matcher::Classification;

/// Per-message permissions, derived and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatingDecision {
    /// Non-command features may run (direct chat, or trigger present).
    pub allow_non_command: bool,

    /// Image/video consuming features may run.
    pub allow_media: bool,

    /// The narrow allow-list of content-pattern features (e.g. recognized
    /// links) that run in a group even without a trigger.
    pub allow_priority: bool,

    /// The conversational fallback may run.
    pub allow_fallback: bool,
}

impl GatingDecision {
    /// Whether a handler of the given category may execute.
    pub fn allows(&self, category: HandlerCategory) -> bool {
        match category {
            HandlerCategory::Priority => self.allow_priority,
            HandlerCategory::Text => self.allow_non_command,
            HandlerCategory::Media => self.allow_media && self.allow_non_command,
        }
    }

    /// True when every feature, fallback included, is vetoed.
    pub fn nothing_allowed(&self) -> bool {
        !(self.allow_non_command || self.allow_media || self.allow_priority || self.allow_fallback)
    }

    fn silence() -> Self {
        Self {
            allow_non_command: false,
            allow_media: false,
            allow_priority: false,
            allow_fallback: false,
        }
    }
}

/// Compute the gating decision for one envelope.
pub fn gate(env: &MessageEnvelope, cls: &Classification) -> GatingDecision {
    let signaled = cls.is_command || cls.has_trigger;

    // A bare reply to quoted content silences everything. Without this the
    // bot would react to every reply in a busy group.
    if env.quoted.is_some() && !signaled {
        return GatingDecision::silence();
    }

    let is_group = env.chat_kind == ChatKind::Group;
    let has_visual = matches!(
        env.attachment,
        AttachmentKind::Image | AttachmentKind::Video
    );

    // Unsignaled media in a group: media features are vetoed, but features
    // reading only the caption text may still evaluate.
    let allow_media = !(is_group && has_visual && !signaled);

    let allow_non_command = !is_group || cls.has_trigger;

    GatingDecision {
        allow_non_command,
        allow_media,
        allow_priority: true,
        allow_fallback: allow_non_command,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::envelope::Quoted;
    use crate::router::matcher::{build_trigger_regex, classify};

    fn env(kind: ChatKind, text: &str) -> MessageEnvelope {
        MessageEnvelope {
            chat_id: 1,
            chat_kind: kind,
            message_id: 1,
            sender_id: 7,
            sender_name: "Tester".to_string(),
            raw_text: text.to_string(),
            attachment: AttachmentKind::None,
            attachment_file_id: None,
            quoted: None,
        }
    }

    fn decide(e: &MessageEnvelope) -> GatingDecision {
        let trigger = build_trigger_regex("elaina");
        let cls = classify(&e.raw_text, '!', &trigger);
        gate(e, &cls)
    }

    #[test]
    fn test_direct_chat_always_allows_non_command() {
        let g = decide(&env(ChatKind::Direct, "halo apa kabar"));
        assert!(g.allow_non_command);
        assert!(g.allow_fallback);
    }

    #[test]
    fn test_group_without_trigger_blocks_non_command() {
        let g = decide(&env(ChatKind::Group, "halo semua"));
        assert!(!g.allow_non_command);
        assert!(!g.allow_fallback);
        // Priority (content-pattern) features still run.
        assert!(g.allow_priority);
    }

    #[test]
    fn test_group_with_trigger_allows_non_command() {
        let g = decide(&env(ChatKind::Group, "elaina tolong dong"));
        assert!(g.allow_non_command);
        assert!(g.allow_fallback);
    }

    #[test]
    fn test_bare_reply_silences_everything() {
        let mut e = env(ChatKind::Group, "wkwk bener banget");
        e.quoted = Some(Quoted {
            text: "ada yang tahu?".to_string(),
            attachment: AttachmentKind::None,
            sender_id: None,
        });
        let g = decide(&e);
        assert!(g.nothing_allowed());
    }

    #[test]
    fn test_triggered_reply_is_not_silenced() {
        let mut e = env(ChatKind::Group, "elaina jawab ini");
        e.quoted = Some(Quoted {
            text: "ada yang tahu?".to_string(),
            attachment: AttachmentKind::None,
            sender_id: None,
        });
        let g = decide(&e);
        assert!(!g.nothing_allowed());
        assert!(g.allow_non_command);
    }

    #[test]
    fn test_group_image_without_trigger_vetoes_media_only() {
        let mut e = env(ChatKind::Group, "lihat ini");
        e.attachment = AttachmentKind::Image;
        let g = decide(&e);
        assert!(!g.allows(HandlerCategory::Media));
        // Caption-text features are vetoed here too, but only because the
        // trigger is missing, not because of the attachment.
        assert!(!g.allow_non_command);
        assert!(g.allow_priority);
    }

    #[test]
    fn test_group_image_with_trigger_allows_media() {
        let mut e = env(ChatKind::Group, "elaina gambar apa ini?");
        e.attachment = AttachmentKind::Image;
        let g = decide(&e);
        assert!(g.allows(HandlerCategory::Media));
    }

    #[test]
    fn test_direct_image_allows_media_without_trigger() {
        let mut e = env(ChatKind::Direct, "");
        e.attachment = AttachmentKind::Image;
        let g = decide(&e);
        assert!(g.allows(HandlerCategory::Media));
    }
}
