//! The warn/redeem state machine.
//!
//! `evaluate_message` is the side-channel entry point: it is called after
//! gating for every ungated group message, asks the judgment collaborator
//! for a verdict, and applies the outcome to the warning ledger. Escalation
//! (removal at the limit) and redemption both live here; the judge itself
//! only ever sees text and rules.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use moka::sync::Cache;
use tracing::{debug, info, warn};

use crate::database::{PeraturanState, WarnRecord};
use crate::router::envelope::{ChatKind, MessageEnvelope};
use crate::utils::{html_escape, mention_html};

use super::command::{PeraturanCommand, USAGE};
use super::judgment::{Judge, JudgmentInput, JudgmentMode};
use super::transport::ModerationTransport;

const RULES_PREVIEW_CHARS: usize = 200;
const STATUS_TOP_WARNS: i64 = 5;

/// Ledger operations the engine needs, kept behind a trait so the state
/// transitions are testable without a database.
#[async_trait]
pub trait ModerationStore: Send + Sync {
    async fn get_rules(&self, chat_id: i64) -> Result<PeraturanState>;

    async fn set_rules(&self, chat_id: i64, enabled: bool, rules: &str) -> Result<()>;

    /// Increment and return the new record. Must be atomic per (chat, user).
    async fn add_warn(&self, chat_id: i64, user_id: i64, reason: &str) -> Result<WarnRecord>;

    /// Decrement by exactly one, never below zero. `None` means there was
    /// nothing to reduce.
    async fn decrement_warn(&self, chat_id: i64, user_id: i64) -> Result<Option<i64>>;

    async fn clear_warns(&self, chat_id: i64, user_id: i64) -> Result<()>;

    async fn list_warns(&self, chat_id: i64, limit: i64) -> Result<Vec<WarnRecord>>;
}

/// Detects an explicit redemption request: the bot addressed by name plus
/// one of the configured redeem phrases.
pub struct RedeemDetector {
    keywords: Vec<String>,
}

impl RedeemDetector {
    pub fn new(keywords: Vec<String>) -> Self {
        let keywords = if keywords.is_empty() {
            Self::default_keywords()
        } else {
            keywords.into_iter().map(|k| k.to_lowercase()).collect()
        };
        Self { keywords }
    }

    fn default_keywords() -> Vec<String> {
        vec![
            "mengurangi warn".to_string(),
            "kurangi warn".to_string(),
            "kurangin warn".to_string(),
        ]
    }

    /// A request counts only when it names the bot and carries a keyword.
    pub fn matches(&self, text: &str, bot_name: &str) -> bool {
        let lower = text.to_lowercase();
        if !lower.contains(&bot_name.to_lowercase()) {
            return false;
        }
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

impl Default for RedeemDetector {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Moderation engine: glues the rules store, the warning ledger, the
/// judgment collaborator and the group chat together.
pub struct ModerationEngine {
    transport: Arc<dyn ModerationTransport>,
    store: Arc<dyn ModerationStore>,
    judge: Arc<dyn Judge>,
    bot_name: String,
    warn_limit: i64,
    redeem: RedeemDetector,
    // At-most-once guard per (chat, message); retries and duplicate
    // deliveries must never double-count a warn.
    seen: Cache<(i64, i32), ()>,
}

impl ModerationEngine {
    pub fn new(
        transport: Arc<dyn ModerationTransport>,
        store: Arc<dyn ModerationStore>,
        judge: Arc<dyn Judge>,
        bot_name: String,
        warn_limit: i64,
    ) -> Self {
        Self {
            transport,
            store,
            judge,
            bot_name,
            warn_limit,
            redeem: RedeemDetector::default(),
            seen: Cache::builder()
                .max_capacity(50_000)
                .time_to_live(Duration::from_secs(600))
                .build(),
        }
    }

    /// Swap the redeem predicate (configured keyword list).
    pub fn with_redeem(mut self, redeem: RedeemDetector) -> Self {
        self.redeem = redeem;
        self
    }

    /// Evaluate one group message against the stored rules.
    ///
    /// No-op unless moderation is enabled with non-empty rules. Judgment
    /// failures propagate to the caller, which logs and abandons them; the
    /// ledger is only touched after a successful verdict.
    pub async fn evaluate_message(&self, env: &MessageEnvelope) -> Result<()> {
        let state = self.store.get_rules(env.chat_id).await?;
        if !state.ready() {
            return Ok(());
        }

        let key = (env.chat_id, env.message_id);
        if self.seen.contains_key(&key) {
            debug!("chat {}: message {} already judged", env.chat_id, env.message_id);
            return Ok(());
        }
        self.seen.insert(key, ());

        // Admins are exempt from the ledger; their messages are never judged.
        if self
            .transport
            .is_admin(env.chat_id, env.sender_id)
            .await
            .unwrap_or(false)
        {
            return Ok(());
        }

        let mode = if self.redeem.matches(&env.raw_text, &self.bot_name) {
            JudgmentMode::Redeem
        } else {
            JudgmentMode::Warn
        };

        let judgment = self
            .judge
            .evaluate(JudgmentInput {
                mode,
                rules: state.rules.clone(),
                bot_name: self.bot_name.clone(),
                message: env.raw_text.clone(),
                user_id: env.sender_id.to_string(),
            })
            .await?;

        match mode {
            JudgmentMode::Redeem if judgment.redeem => self.apply_redeem(env).await,
            JudgmentMode::Warn if judgment.violation => {
                self.apply_warn(env, &judgment.reason).await
            }
            _ => Ok(()),
        }
    }

    async fn apply_warn(&self, env: &MessageEnvelope, reason: &str) -> Result<()> {
        // Removing the offending message is best effort; the warn itself
        // must land even when the bot lacks delete rights.
        if let Err(err) = self
            .transport
            .delete_message(env.chat_id, env.message_id)
            .await
        {
            warn!("chat {}: could not delete message: {:#}", env.chat_id, err);
        }

        let record = self
            .store
            .add_warn(env.chat_id, env.sender_id as i64, reason)
            .await?;

        info!(
            "chat {}: warn {}/{} for user {} ({})",
            env.chat_id, record.count, self.warn_limit, env.sender_id, reason
        );

        if record.count >= self.warn_limit {
            self.remove_member(env, &record).await
        } else {
            let text = warn_notice(
                &mention_html(env.sender_id, &env.sender_name),
                record.count,
                self.warn_limit,
                reason,
            );
            self.transport.send_notice(env.chat_id, None, &text).await
        }
    }

    /// Threshold reached: kick the member and reset their count so a return
    /// starts from a clean ledger. The removal announcement replaces the
    /// per-warn notice.
    async fn remove_member(&self, env: &MessageEnvelope, record: &WarnRecord) -> Result<()> {
        self.transport.kick_member(env.chat_id, env.sender_id).await?;

        self.store
            .clear_warns(env.chat_id, env.sender_id as i64)
            .await?;

        info!(
            "chat {}: user {} removed at {}/{} warns",
            env.chat_id, env.sender_id, record.count, self.warn_limit
        );

        let text = removal_notice(
            &mention_html(env.sender_id, &env.sender_name),
            self.warn_limit,
        );
        self.transport.send_notice(env.chat_id, None, &text).await
    }

    async fn apply_redeem(&self, env: &MessageEnvelope) -> Result<()> {
        let mention = mention_html(env.sender_id, &env.sender_name);

        let text = match self
            .store
            .decrement_warn(env.chat_id, env.sender_id as i64)
            .await?
        {
            Some(remaining) => redeem_notice(&mention, remaining, self.warn_limit),
            None => format!("{} kamu tidak punya warn yang bisa dikurangi.", mention),
        };

        self.transport
            .send_notice(env.chat_id, Some(env.message_id), &text)
            .await
    }

    /// Handle the `!peraturan` command family. Group only, admin only.
    pub async fn handle_command(&self, env: &MessageEnvelope, args: &str) -> Result<()> {
        if env.chat_kind != ChatKind::Group {
            self.reply(env, "Perintah peraturan hanya berlaku di grup.")
                .await?;
            return Ok(());
        }

        if !self
            .transport
            .is_admin(env.chat_id, env.sender_id)
            .await?
        {
            self.reply(env, "Hanya admin yang boleh mengatur peraturan.")
                .await?;
            return Ok(());
        }

        let Some(cmd) = PeraturanCommand::parse(args) else {
            self.reply(env, USAGE).await?;
            return Ok(());
        };

        match cmd {
            PeraturanCommand::On => self.cmd_on(env).await,
            PeraturanCommand::Off => self.cmd_off(env).await,
            PeraturanCommand::Sync => self.cmd_sync(env).await,
            PeraturanCommand::Status => self.cmd_status(env).await,
            PeraturanCommand::Rules => self.cmd_rules(env).await,
            PeraturanCommand::Clear => self.cmd_clear(env, args).await,
        }
    }

    async fn cmd_on(&self, env: &MessageEnvelope) -> Result<()> {
        match self.fetch_description(env.chat_id).await? {
            Some(rules) => {
                self.store.set_rules(env.chat_id, true, &rules).await?;
                self.reply(
                    env,
                    "Moderasi aktif. Peraturan diambil dari deskripsi grup.\nEdit deskripsi lalu jalankan !peraturan sync untuk memperbarui.",
                )
                .await
            }
            None => {
                // Empty description: refuse to enable rather than moderate
                // against nothing.
                self.reply(
                    env,
                    "Deskripsi grup kosong. Tulis peraturan di deskripsi grup dulu, baru aktifkan.",
                )
                .await
            }
        }
    }

    async fn cmd_off(&self, env: &MessageEnvelope) -> Result<()> {
        let state = self.store.get_rules(env.chat_id).await?;
        self.store.set_rules(env.chat_id, false, &state.rules).await?;
        self.reply(env, "Moderasi dimatikan. Peraturan tersimpan tidak dihapus.")
            .await
    }

    async fn cmd_sync(&self, env: &MessageEnvelope) -> Result<()> {
        match self.fetch_description(env.chat_id).await? {
            Some(rules) => {
                let state = self.store.get_rules(env.chat_id).await?;
                self.store
                    .set_rules(env.chat_id, state.enabled, &rules)
                    .await?;
                self.reply(env, "Peraturan disinkronkan dari deskripsi grup.")
                    .await
            }
            None => {
                self.reply(env, "Deskripsi grup kosong, tidak ada yang disinkronkan.")
                    .await
            }
        }
    }

    async fn cmd_status(&self, env: &MessageEnvelope) -> Result<()> {
        let state = self.store.get_rules(env.chat_id).await?;
        let warns = self.store.list_warns(env.chat_id, STATUS_TOP_WARNS).await?;

        let mut text = format!(
            "Moderasi: <b>{}</b>\n",
            if state.enabled { "aktif" } else { "nonaktif" }
        );

        if state.rules.trim().is_empty() {
            text.push_str("Peraturan: <i>belum ada</i>\n");
        } else {
            text.push_str(&format!(
                "Peraturan: {}\n",
                html_escape(&rules_preview(&state.rules, RULES_PREVIEW_CHARS))
            ));
        }

        if warns.is_empty() {
            text.push_str("Belum ada warn.");
        } else {
            text.push_str("Warn terbanyak:\n");
            for rec in warns {
                text.push_str(&format!(
                    "- <code>{}</code>: {}/{}\n",
                    rec.user_id, rec.count, self.warn_limit
                ));
            }
        }

        self.reply_html(env, &text).await
    }

    async fn cmd_rules(&self, env: &MessageEnvelope) -> Result<()> {
        let state = self.store.get_rules(env.chat_id).await?;
        if state.rules.trim().is_empty() {
            self.reply(env, "Belum ada peraturan tersimpan. Jalankan !peraturan on.")
                .await
        } else {
            let text = format!("<b>Peraturan grup:</b>\n{}", html_escape(&state.rules));
            self.reply_html(env, &text).await
        }
    }

    async fn cmd_clear(&self, env: &MessageEnvelope, args: &str) -> Result<()> {
        // Target: numeric id after "clear", or the sender of the quoted
        // message.
        let target = args
            .split_whitespace()
            .nth(1)
            .and_then(|w| w.parse::<i64>().ok())
            .or_else(|| {
                env.quoted
                    .as_ref()
                    .and_then(|q| q.sender_id)
                    .map(|id| id as i64)
            });

        let Some(target) = target else {
            self.reply(
                env,
                "Sebutkan user id atau balas pesan orangnya: !peraturan clear <user_id>",
            )
            .await?;
            return Ok(());
        };

        self.store.clear_warns(env.chat_id, target).await?;
        self.reply_html(env, &format!("Warn untuk <code>{}</code> direset.", target))
            .await?;
        Ok(())
    }

    async fn fetch_description(&self, chat_id: i64) -> Result<Option<String>> {
        let rules = self
            .transport
            .group_description(chat_id)
            .await?
            .map(|d| sanitize_rules(&d))
            .filter(|r| !r.is_empty());
        Ok(rules)
    }

    async fn reply(&self, env: &MessageEnvelope, text: &str) -> Result<()> {
        self.reply_html(env, &html_escape(text)).await
    }

    async fn reply_html(&self, env: &MessageEnvelope, text: &str) -> Result<()> {
        self.transport
            .send_notice(env.chat_id, Some(env.message_id), text)
            .await
    }
}

/// Normalize a group description into rules text.
pub fn sanitize_rules(raw: &str) -> String {
    raw.replace('\r', "")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// First `max` characters of the rules on a single line.
pub fn rules_preview(rules: &str, max: usize) -> String {
    let flat = rules.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

fn warn_notice(mention: &str, count: i64, limit: i64, reason: &str) -> String {
    format!(
        "{} Peringatan {}/{}: {}",
        mention,
        count,
        limit,
        html_escape(reason)
    )
}

fn removal_notice(mention: &str, limit: i64) -> String {
    format!(
        "{} mencapai {} peringatan dan dikeluarkan dari grup. Warn direset.",
        mention, limit
    )
}

fn redeem_notice(mention: &str, remaining: i64, limit: i64) -> String {
    format!(
        "{} permintaanmu diterima. Warn berkurang menjadi {}/{}.",
        mention, remaining, limit
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::judgment::Judgment;
    use crate::router::envelope::AttachmentKind;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubJudge {
        judgment: Judgment,
        calls: AtomicUsize,
    }

    impl StubJudge {
        fn violation(reason: &str) -> Self {
            Self {
                judgment: Judgment {
                    violation: true,
                    reason: reason.to_string(),
                    redeem: false,
                },
                calls: AtomicUsize::new(0),
            }
        }

        fn redeem() -> Self {
            Self {
                judgment: Judgment {
                    violation: false,
                    reason: String::new(),
                    redeem: true,
                },
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Judge for StubJudge {
        async fn evaluate(&self, _input: JudgmentInput) -> Result<Judgment> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.judgment.clone())
        }
    }

    #[derive(Default)]
    struct StubStore {
        enabled: bool,
        rules: String,
        counts: Mutex<HashMap<i64, i64>>,
    }

    impl StubStore {
        fn active(rules: &str) -> Self {
            Self {
                enabled: true,
                rules: rules.to_string(),
                counts: Mutex::new(HashMap::new()),
            }
        }

        fn count(&self, user_id: i64) -> Option<i64> {
            self.counts.lock().get(&user_id).copied()
        }

        fn preset(&self, user_id: i64, count: i64) {
            self.counts.lock().insert(user_id, count);
        }
    }

    #[async_trait]
    impl ModerationStore for StubStore {
        async fn get_rules(&self, chat_id: i64) -> Result<PeraturanState> {
            let mut state = PeraturanState::new(chat_id);
            state.enabled = self.enabled;
            state.rules = self.rules.clone();
            Ok(state)
        }

        async fn set_rules(&self, _chat_id: i64, _enabled: bool, _rules: &str) -> Result<()> {
            Ok(())
        }

        async fn add_warn(&self, chat_id: i64, user_id: i64, reason: &str) -> Result<WarnRecord> {
            let mut counts = self.counts.lock();
            let count = counts.entry(user_id).or_insert(0);
            *count += 1;
            Ok(WarnRecord {
                id: None,
                chat_id,
                user_id,
                count: *count,
                last_reason: reason.to_string(),
                updated_at: 0,
            })
        }

        async fn decrement_warn(&self, _chat_id: i64, user_id: i64) -> Result<Option<i64>> {
            let mut counts = self.counts.lock();
            match counts.get_mut(&user_id) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    let remaining = *count;
                    if remaining == 0 {
                        counts.remove(&user_id);
                    }
                    Ok(Some(remaining))
                }
                _ => Ok(None),
            }
        }

        async fn clear_warns(&self, _chat_id: i64, user_id: i64) -> Result<()> {
            self.counts.lock().remove(&user_id);
            Ok(())
        }

        async fn list_warns(&self, _chat_id: i64, _limit: i64) -> Result<Vec<WarnRecord>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct StubTransport {
        admin: bool,
        notices: Mutex<Vec<String>>,
        deletes: AtomicUsize,
        kicks: Mutex<Vec<u64>>,
    }

    impl StubTransport {
        fn notices(&self) -> Vec<String> {
            self.notices.lock().clone()
        }
    }

    #[async_trait]
    impl ModerationTransport for StubTransport {
        async fn delete_message(&self, _chat_id: i64, _message_id: i32) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn send_notice(&self, _chat_id: i64, _reply_to: Option<i32>, html: &str) -> Result<()> {
            self.notices.lock().push(html.to_string());
            Ok(())
        }

        async fn kick_member(&self, _chat_id: i64, user_id: u64) -> Result<()> {
            self.kicks.lock().push(user_id);
            Ok(())
        }

        async fn group_description(&self, _chat_id: i64) -> Result<Option<String>> {
            Ok(Some("1. Dilarang spam".to_string()))
        }

        async fn is_admin(&self, _chat_id: i64, _user_id: u64) -> Result<bool> {
            Ok(self.admin)
        }
    }

    const USER: u64 = 77;
    const LIMIT: i64 = 5;

    fn group_env(message_id: i32, text: &str) -> MessageEnvelope {
        MessageEnvelope {
            chat_id: -100,
            chat_kind: ChatKind::Group,
            message_id,
            sender_id: USER,
            sender_name: "Tester".to_string(),
            raw_text: text.to_string(),
            attachment: AttachmentKind::None,
            attachment_file_id: None,
            quoted: None,
        }
    }

    fn engine(
        judge: StubJudge,
        store: StubStore,
        transport: StubTransport,
    ) -> (ModerationEngine, Arc<StubJudge>, Arc<StubStore>, Arc<StubTransport>) {
        let judge = Arc::new(judge);
        let store = Arc::new(store);
        let transport = Arc::new(transport);
        let engine = ModerationEngine::new(
            transport.clone(),
            store.clone(),
            judge.clone(),
            "Elaina".to_string(),
            LIMIT,
        );
        (engine, judge, store, transport)
    }

    #[tokio::test]
    async fn test_violation_below_limit_notices_count() {
        let (engine, _, store, transport) = engine(
            StubJudge::violation("spam"),
            StubStore::active("1. Dilarang spam"),
            StubTransport::default(),
        );
        store.preset(USER as i64, 1);

        engine
            .evaluate_message(&group_env(1, "beli followers murah!"))
            .await
            .unwrap();

        assert_eq!(store.count(USER as i64), Some(2));
        assert_eq!(transport.deletes.load(Ordering::SeqCst), 1);
        assert!(transport.kicks.lock().is_empty());

        let notices = transport.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("Peringatan 2/5"));
    }

    #[tokio::test]
    async fn test_removal_exactly_at_limit_resets_count() {
        let (engine, _, store, transport) = engine(
            StubJudge::violation("spam"),
            StubStore::active("1. Dilarang spam"),
            StubTransport::default(),
        );
        store.preset(USER as i64, LIMIT - 1);

        engine
            .evaluate_message(&group_env(1, "beli followers murah!"))
            .await
            .unwrap();

        // Kicked exactly once, ledger back to clean.
        assert_eq!(transport.kicks.lock().clone(), vec![USER]);
        assert_eq!(store.count(USER as i64), None);

        // The removal announcement replaces the per-warn notice.
        let notices = transport.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("dikeluarkan"));
        assert!(!notices[0].contains("Peringatan 5/5"));

        // A later violation starts over from one.
        engine
            .evaluate_message(&group_env(2, "spam lagi"))
            .await
            .unwrap();
        assert_eq!(store.count(USER as i64), Some(1));
        assert_eq!(transport.kicks.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_judged_once() {
        let (engine, judge, store, transport) = engine(
            StubJudge::violation("spam"),
            StubStore::active("1. Dilarang spam"),
            StubTransport::default(),
        );

        let env = group_env(9, "beli followers murah!");
        engine.evaluate_message(&env).await.unwrap();
        engine.evaluate_message(&env).await.unwrap();

        assert_eq!(judge.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.count(USER as i64), Some(1));
        assert_eq!(transport.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_redeem_decrements_by_one() {
        let (engine, _, store, transport) = engine(
            StubJudge::redeem(),
            StubStore::active("1. Dilarang spam"),
            StubTransport::default(),
        );
        store.preset(USER as i64, 3);

        engine
            .evaluate_message(&group_env(1, "Elaina aku mau mengurangi warn"))
            .await
            .unwrap();

        assert_eq!(store.count(USER as i64), Some(2));
        assert!(transport.notices()[0].contains("2/5"));
    }

    #[tokio::test]
    async fn test_redeem_at_zero_reduces_nothing() {
        let (engine, _, store, transport) = engine(
            StubJudge::redeem(),
            StubStore::active("1. Dilarang spam"),
            StubTransport::default(),
        );

        engine
            .evaluate_message(&group_env(1, "Elaina aku mau mengurangi warn"))
            .await
            .unwrap();

        assert_eq!(store.count(USER as i64), None);
        assert!(transport.notices()[0].contains("tidak punya warn"));
    }

    #[tokio::test]
    async fn test_disabled_rules_never_judge() {
        let (engine, judge, _, transport) = engine(
            StubJudge::violation("spam"),
            StubStore::default(),
            StubTransport::default(),
        );

        engine
            .evaluate_message(&group_env(1, "beli followers murah!"))
            .await
            .unwrap();

        assert_eq!(judge.calls.load(Ordering::SeqCst), 0);
        assert!(transport.notices().is_empty());
    }

    #[tokio::test]
    async fn test_admins_are_exempt() {
        let (engine, judge, store, _) = engine(
            StubJudge::violation("spam"),
            StubStore::active("1. Dilarang spam"),
            StubTransport {
                admin: true,
                ..Default::default()
            },
        );

        engine
            .evaluate_message(&group_env(1, "beli followers murah!"))
            .await
            .unwrap();

        assert_eq!(judge.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.count(USER as i64), None);
    }

    #[test]
    fn test_redeem_requires_bot_name() {
        let det = RedeemDetector::default();
        assert!(det.matches("Elaina aku mau kurangi warn dong", "Elaina"));
        assert!(!det.matches("aku mau kurangi warn dong", "Elaina"));
    }

    #[test]
    fn test_redeem_requires_keyword() {
        let det = RedeemDetector::default();
        assert!(!det.matches("elaina kamu lucu banget", "Elaina"));
        assert!(det.matches("elaina tolong kurangin warn aku", "Elaina"));
    }

    #[test]
    fn test_redeem_custom_keywords_lowercased() {
        let det = RedeemDetector::new(vec!["Hapus Warn".to_string()]);
        assert!(det.matches("elaina hapus warn ku ya", "Elaina"));
        assert!(!det.matches("elaina kurangi warn", "Elaina"));
    }

    #[test]
    fn test_sanitize_rules_strips_padding() {
        let raw = "  \r\n1. Dilarang spam   \r\n2. Hormati member\r\n\r\n";
        assert_eq!(sanitize_rules(raw), "1. Dilarang spam\n2. Hormati member");
    }

    #[test]
    fn test_rules_preview_truncates() {
        let rules = "a".repeat(300);
        let preview = rules_preview(&rules, 200);
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with("..."));

        assert_eq!(rules_preview("singkat saja", 200), "singkat saja");
    }

    #[test]
    fn test_warn_notice_counts_toward_limit() {
        let text = warn_notice("@user", 3, 5, "posting tautan judi");
        assert!(text.contains("Peringatan 3/5"));
        assert!(text.contains("posting tautan judi"));
    }

    #[test]
    fn test_removal_replaces_warn_notice() {
        let text = removal_notice("@user", 5);
        assert!(text.contains("5 peringatan"));
        assert!(text.contains("dikeluarkan"));
        assert!(!text.contains("Peringatan 5/5"));
    }

    #[test]
    fn test_redeem_notice_reports_remaining() {
        assert!(redeem_notice("@user", 2, 5).contains("2/5"));
    }
}
