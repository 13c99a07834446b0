//! Trigger and command classification.
//!
//! Pure text analysis: whether a message is an explicit command, and whether
//! the configured trigger word appears anywhere in it. The two flags are
//! independent and may both be true; priority between them belongs to the
//! router, not here.

use regex::Regex;

/// Result of classifying a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_command: bool,

    /// Case-folded command name, empty when `is_command` is false.
    pub command: String,

    /// Remainder after the command name, trimmed.
    pub args: String,

    pub has_trigger: bool,
}

/// Build the word-boundary trigger regex once at startup.
///
/// # Panics
/// Panics if the trigger word escapes into an invalid pattern (it cannot:
/// the word is regex-escaped).
pub fn build_trigger_regex(trigger: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(trigger))).expect("valid trigger regex")
}

/// Classify a message body against the command prefix and trigger word.
pub fn classify(raw_text: &str, prefix: char, trigger: &Regex) -> Classification {
    let has_trigger = trigger.is_match(raw_text);

    let trimmed = raw_text.trim();
    let (is_command, command, args) = match trimmed.strip_prefix(prefix) {
        Some(rest) => {
            let rest = rest.trim_start();
            if rest.is_empty() {
                (false, String::new(), String::new())
            } else {
                let (command, args) = match rest.split_once(char::is_whitespace) {
                    Some((cmd, tail)) => (cmd, tail.trim()),
                    None => (rest, ""),
                };
                (true, command.to_lowercase(), args.to_string())
            }
        }
        None => (false, String::new(), String::new()),
    };

    Classification {
        is_command,
        command,
        args,
        has_trigger,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_default(text: &str) -> Classification {
        let trigger = build_trigger_regex("elaina");
        classify(text, '!', &trigger)
    }

    #[test]
    fn test_command_detection() {
        let cls = classify_default("  !Help   aku  ");
        assert!(cls.is_command);
        assert_eq!(cls.command, "help");
        assert_eq!(cls.args, "aku");
        assert!(!cls.has_trigger);
    }

    #[test]
    fn test_command_without_args() {
        let cls = classify_default("!whoami");
        assert!(cls.is_command);
        assert_eq!(cls.command, "whoami");
        assert_eq!(cls.args, "");
    }

    #[test]
    fn test_bare_prefix_is_not_a_command() {
        let cls = classify_default("!");
        assert!(!cls.is_command);
        assert!(cls.command.is_empty());
    }

    #[test]
    fn test_trigger_anywhere_case_insensitive() {
        assert!(classify_default("please elaina help me").has_trigger);
        assert!(classify_default("ELAINA, stop").has_trigger);
        assert!(!classify_default("helena stop").has_trigger);
    }

    #[test]
    fn test_trigger_requires_word_boundary() {
        assert!(!classify_default("elainas kitchen").has_trigger);
        assert!(classify_default("(elaina)").has_trigger);
    }

    #[test]
    fn test_command_and_trigger_both_reported() {
        let cls = classify_default("!elaina persona elaina2");
        assert!(cls.is_command);
        assert_eq!(cls.command, "elaina");
        assert_eq!(cls.args, "persona elaina2");
        assert!(cls.has_trigger);
    }

    #[test]
    fn test_custom_prefix() {
        let trigger = build_trigger_regex("elaina");
        let cls = classify("/help", '/', &trigger);
        assert!(cls.is_command);
        assert_eq!(cls.command, "help");
    }
}
