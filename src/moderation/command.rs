//! The explicit moderation command set.
//!
//! The original text-driven state machine is an enumerated command type
//! dispatched through a match; persisted `PeraturanState` is the single
//! source of truth for `enabled`.

/// Subcommands of `!peraturan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeraturanCommand {
    /// Enable moderation, reading rules from the group description.
    On,
    /// Disable moderation, keeping stored rules.
    Off,
    /// Re-read the group description into the rules text.
    Sync,
    /// Show enabled flag, rules preview and the top warn counts.
    Status,
    /// Show the full stored rules.
    Rules,
    /// Force-reset one user's warn count (admin only).
    Clear,
}

impl PeraturanCommand {
    /// Parse the first word of the command arguments.
    pub fn parse(args: &str) -> Option<Self> {
        let sub = args.split_whitespace().next()?.to_lowercase();
        match sub.as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "sync" | "reload" => Some(Self::Sync),
            "status" => Some(Self::Status),
            "rules" => Some(Self::Rules),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }
}

/// Usage text for the command, shown on empty or unknown input.
pub const USAGE: &str = "Gunakan: !peraturan on|off|sync|status|rules|clear <user>\n\
Untuk mengurangi warn: sebut nama bot lalu tulis \"saya mau mengurangi warn\".";
