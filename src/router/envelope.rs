//! Message envelope: the normalized unit of work flowing through the router.

use teloxide::types::Message;

/// Direct (private) chat or group chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Direct,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachmentKind {
    #[default]
    None,
    Image,
    Video,
    Audio,
}

/// Quoted (replied-to) content carried by a reply message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quoted {
    pub text: String,
    pub attachment: AttachmentKind,
    pub sender_id: Option<u64>,
}

/// Normalized inbound message. Built once per update and treated as
/// immutable: handlers derive prompt strings from it, never rewrite it.
#[derive(Debug, Clone)]
pub struct MessageEnvelope {
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub message_id: i32,
    pub sender_id: u64,
    pub sender_name: String,

    /// Message body, or the caption when the message carries media.
    pub raw_text: String,

    pub attachment: AttachmentKind,
    pub attachment_file_id: Option<String>,

    pub quoted: Option<Quoted>,
}

impl MessageEnvelope {
    /// Normalize a Telegram message. Returns `None` for updates the router
    /// has no business with (no sender, channel posts, empty service
    /// messages).
    pub fn from_message(msg: &Message) -> Option<Self> {
        let from = msg.from.as_ref()?;

        let chat_kind = if msg.chat.is_private() {
            ChatKind::Direct
        } else if msg.chat.is_group() || msg.chat.is_supergroup() {
            ChatKind::Group
        } else {
            return None;
        };

        let raw_text = msg
            .text()
            .or_else(|| msg.caption())
            .unwrap_or("")
            .to_string();

        let (attachment, attachment_file_id) = attachment_of(msg);

        if raw_text.is_empty() && attachment == AttachmentKind::None {
            return None;
        }

        let quoted = msg.reply_to_message().and_then(|reply| {
            let text = reply
                .text()
                .or_else(|| reply.caption())
                .unwrap_or("")
                .to_string();
            let (kind, _) = attachment_of(reply);
            if text.is_empty() && kind == AttachmentKind::None {
                return None;
            }
            Some(Quoted {
                text,
                attachment: kind,
                sender_id: reply.from.as_ref().map(|u| u.id.0),
            })
        });

        Some(Self {
            chat_id: msg.chat.id.0,
            chat_kind,
            message_id: msg.id.0,
            sender_id: from.id.0,
            sender_name: from.first_name.clone(),
            raw_text,
            attachment,
            attachment_file_id,
            quoted,
        })
    }
}

fn attachment_of(msg: &Message) -> (AttachmentKind, Option<String>) {
    if let Some(photos) = msg.photo() {
        // Largest size is last.
        let file_id = photos.last().map(|p| p.file.id.clone());
        return (AttachmentKind::Image, file_id);
    }
    if let Some(video) = msg.video() {
        return (AttachmentKind::Video, Some(video.file.id.clone()));
    }
    if let Some(voice) = msg.voice() {
        return (AttachmentKind::Audio, Some(voice.file.id.clone()));
    }
    if let Some(audio) = msg.audio() {
        return (AttachmentKind::Audio, Some(audio.file.id.clone()));
    }
    (AttachmentKind::None, None)
}
