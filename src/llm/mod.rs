//! Gemini client used by the feature handlers and the fallback responder.
//!
//! Multiple API keys are rotated through an explicit cursor owned by the
//! client and guarded by a mutex; a failing key advances the cursor and the
//! call is retried with the next one.

mod persona;

pub use persona::system_prompt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

const TEXT_MODEL: &str = "gemini-2.5-flash-lite";
const IMAGE_MODEL: &str = "gemini-2.0-flash-exp-image-generation";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no Gemini API key configured")]
    MissingKey,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("empty response from model")]
    EmptyResponse,
}

/// Gemini API client with key rotation.
pub struct GeminiClient {
    keys: Vec<String>,
    cursor: Mutex<usize>,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[allow(dead_code)]
    #[serde(default)]
    mime_type: String,
    data: String,
}

impl GeminiClient {
    pub fn new(keys: Vec<String>, timeout: std::time::Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            keys,
            cursor: Mutex::new(0),
            http,
        })
    }

    fn current_key(&self) -> Option<String> {
        let idx = *self.cursor.lock();
        self.keys.get(idx).cloned()
    }

    fn rotate(&self) {
        if self.keys.len() > 1 {
            let mut idx = self.cursor.lock();
            *idx = (*idx + 1) % self.keys.len();
        }
    }

    /// Ask the text model. Tries every configured key before giving up.
    pub async fn ask_text(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let body = json!({
            "system_instruction": { "role": "system", "parts": [{ "text": system }] },
            "contents": [{ "role": "user", "parts": [{ "text": user }] }],
        });
        self.generate_text(TEXT_MODEL, body).await
    }

    /// Ask the text model with an inline image.
    pub async fn ask_vision(
        &self,
        system: &str,
        prompt: &str,
        image: &[u8],
        mime: &str,
    ) -> Result<String, LlmError> {
        let body = json!({
            "system_instruction": { "role": "system", "parts": [{ "text": system }] },
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    { "inlineData": { "mimeType": mime, "data": BASE64.encode(image) } },
                ],
            }],
        });
        self.generate_text(TEXT_MODEL, body).await
    }

    /// Generate an image, returning the decoded bytes of the first image part.
    pub async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, LlmError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        });

        let response = self.generate(IMAGE_MODEL, body).await?;
        let image = response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data)
            .and_then(|d| BASE64.decode(d.data).ok())
            .filter(|b| !b.is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        Ok(image)
    }

    async fn generate_text(&self, model: &str, body: Value) -> Result<String, LlmError> {
        let response = self.generate(model, body).await?;
        let text: String = response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }

    async fn generate(&self, model: &str, body: Value) -> Result<GenerateResponse, LlmError> {
        let attempts = self.keys.len().max(1);
        let mut last_err = LlmError::MissingKey;

        for _ in 0..attempts {
            let key = self.current_key().ok_or(LlmError::MissingKey)?;
            match self.send(model, &key, &body).await {
                Ok(resp) => return Ok(resp),
                Err(err) => {
                    warn!("Gemini call failed, rotating key: {}", err);
                    self.rotate();
                    last_err = err;
                }
            }
        }

        Err(last_err)
    }

    async fn send(&self, model: &str, key: &str, body: &Value) -> Result<GenerateResponse, LlmError> {
        let url = format!("{}/{}:generateContent?key={}", API_BASE, model, key);
        let resp = self.http.post(&url).json(body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<GenerateResponse>().await?)
    }
}
