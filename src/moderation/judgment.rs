//! External judgment collaborator for moderation.
//!
//! Turns free text plus the group rules into a structured verdict. The
//! production implementation asks Gemini; the `Judge` trait keeps the engine
//! testable with stubs. The model likes to wrap its JSON in code fences or
//! prose, so the payload is extracted defensively.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const MODERATION_MODEL: &str = "gemini-2.0-flash-lite";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const DEFAULT_SYSTEM: &str = "Kamu adalah moderator grup. Evaluasi pesan berdasarkan aturan grup yang diberikan.\n\
Selalu balas dengan JSON valid dengan format {\"violation\":bool,\"reason\":string,\"redeem\":bool}.\n\
- Mode WARN: tentukan apakah pesan melanggar aturan. Jika ya, violation=true dan reason singkat (<=120 karakter) dalam Bahasa Indonesia sopan.\n\
- Mode REDEEM: tentukan apakah pesan adalah permintaan pengurangan warn yang sah dengan menyebut nama bot. Jika sah, set redeem=true. Selain itu violation=false.\n\
- Jika tidak melanggar, violation=false dan reason kosong.\n\
Jangan tambahkan teks lain selain JSON.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgmentMode {
    Warn,
    Redeem,
}

impl JudgmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warn => "WARN",
            Self::Redeem => "REDEEM",
        }
    }
}

/// Context sent to the collaborator.
#[derive(Debug, Clone)]
pub struct JudgmentInput {
    pub mode: JudgmentMode,
    pub rules: String,
    pub bot_name: String,
    pub message: String,
    pub user_id: String,
}

/// Ephemeral verdict; never persisted, only its effect on the ledger is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Judgment {
    #[serde(default)]
    pub violation: bool,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub redeem: bool,
}

/// The judgment collaborator boundary.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn evaluate(&self, input: JudgmentInput) -> Result<Judgment>;
}

/// Gemini-backed judge.
pub struct GeminiJudge {
    api_key: String,
    system: String,
    http: reqwest::Client,
}

impl GeminiJudge {
    pub fn new(api_key: String, system_override: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(45))
            .build()
            .context("build judgment http client")?;
        Ok(Self {
            api_key,
            system: system_override.unwrap_or_else(|| DEFAULT_SYSTEM.to_string()),
            http,
        })
    }
}

#[async_trait]
impl Judge for GeminiJudge {
    async fn evaluate(&self, input: JudgmentInput) -> Result<Judgment> {
        let body = json!({
            "system_instruction": { "role": "system", "parts": [{ "text": self.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": build_prompt(&input) }] }],
        });

        let url = format!(
            "{}/{}:generateContent?key={}",
            API_BASE, MODERATION_MODEL, self.api_key
        );
        let resp = self.http.post(&url).json(&body).send().await?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            bail!("judgment model returned status {}: {}", status, raw);
        }

        let text = candidate_text(&raw).context("judgment response had no candidates")?;
        let payload = extract_payload(&text);
        let judgment: Judgment = serde_json::from_str(&payload)
            .with_context(|| format!("parse judgment payload (raw={})", text))?;

        Ok(judgment)
    }
}

fn build_prompt(input: &JudgmentInput) -> String {
    format!(
        "Mode: {}\nBot: {}\nUser: {}\nAturan grup:\n{}\nPesan:\n{}\nBalas JSON sesuai format.",
        input.mode.as_str(),
        input.bot_name,
        input.user_id,
        input.rules.trim(),
        input.message.trim(),
    )
}

fn candidate_text(raw: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Response {
        #[serde(default)]
        candidates: Vec<Candidate>,
    }
    #[derive(Deserialize)]
    struct Candidate {
        #[serde(default)]
        content: Option<Content>,
    }
    #[derive(Deserialize)]
    struct Content {
        #[serde(default)]
        parts: Vec<Part>,
    }
    #[derive(Deserialize)]
    struct Part {
        #[serde(default)]
        text: Option<String>,
    }

    let parsed: Response = serde_json::from_str(raw).ok()?;
    let text: String = parsed
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect();

    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extract the embedded JSON object from a possibly-decorated model answer.
pub fn extract_payload(s: &str) -> String {
    let mut out = s.trim();

    if let Some(stripped) = out.strip_prefix("```") {
        // Drop the fence line (and a possible language tag), then the
        // closing fence.
        out = stripped;
        if let Some(idx) = out.find('\n') {
            out = &out[idx + 1..];
        }
        if let Some(pos) = out.rfind("```") {
            out = &out[..pos];
        }
        out = out.trim();
    }

    if let (Some(start), Some(end)) = (out.find('{'), out.rfind('}')) {
        if end > start {
            return out[start..=end].trim().to_string();
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_json() {
        let raw = r#"{"violation":true,"reason":"spam","redeem":false}"#;
        assert_eq!(extract_payload(raw), raw);
    }

    #[test]
    fn test_extract_fenced_json() {
        let raw = "```json\n{\"violation\":false,\"reason\":\"\",\"redeem\":true}\n```";
        let payload = extract_payload(raw);
        let parsed: Judgment = serde_json::from_str(&payload).unwrap();
        assert!(parsed.redeem);
        assert!(!parsed.violation);
    }

    #[test]
    fn test_extract_json_embedded_in_prose() {
        let raw = "Tentu, ini hasilnya: {\"violation\":true,\"reason\":\"posted a link\",\"redeem\":false} semoga membantu";
        let parsed: Judgment = serde_json::from_str(&extract_payload(raw)).unwrap();
        assert!(parsed.violation);
        assert_eq!(parsed.reason, "posted a link");
    }

    #[test]
    fn test_missing_fields_default_to_false() {
        let parsed: Judgment = serde_json::from_str("{}").unwrap();
        assert!(!parsed.violation);
        assert!(!parsed.redeem);
        assert!(parsed.reason.is_empty());
    }

    #[test]
    fn test_build_prompt_contains_all_context() {
        let prompt = build_prompt(&JudgmentInput {
            mode: JudgmentMode::Warn,
            rules: "1. Dilarang spam".to_string(),
            bot_name: "Elaina".to_string(),
            message: "beli followers murah!".to_string(),
            user_id: "123".to_string(),
        });
        assert!(prompt.contains("Mode: WARN"));
        assert!(prompt.contains("Dilarang spam"));
        assert!(prompt.contains("beli followers"));
    }
}
