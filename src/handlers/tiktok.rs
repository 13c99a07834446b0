//! TikTok link handler.
//!
//! Any message carrying a TikTok link is claimed, resolved through the
//! TikWM API and answered with the watermark-free video.

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, MessageId, ReplyParameters};
use tracing::{info, warn};
use url::Url;

use crate::bot::ElainaBot;
use crate::router::chain::{Handler, HandlerCategory};
use crate::router::envelope::MessageEnvelope;

const TIKWM_API: &str = "https://www.tikwm.com/api/";

static TIKTOK_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.|vm\.|vt\.|m\.)?tiktok\.com/\S+").expect("valid tiktok link regex")
});

#[derive(Debug, Deserialize)]
struct TikwmResponse {
    #[serde(default)]
    code: i64,

    #[serde(default)]
    msg: String,

    #[serde(default)]
    data: Option<TikwmData>,
}

#[derive(Debug, Deserialize)]
struct TikwmData {
    #[serde(default)]
    play: Option<String>,

    #[serde(default)]
    title: Option<String>,
}

pub struct TikTokHandler {
    bot: ElainaBot,
    http: reqwest::Client,
}

impl TikTokHandler {
    pub fn new(bot: ElainaBot, http: reqwest::Client) -> Self {
        Self { bot, http }
    }

    async fn resolve(&self, link: &str) -> Result<TikwmResponse> {
        let resp = self
            .http
            .get(TIKWM_API)
            .query(&[("url", link)])
            .send()
            .await?;
        Ok(resp.json::<TikwmResponse>().await?)
    }
}

#[async_trait]
impl Handler for TikTokHandler {
    fn name(&self) -> &'static str {
        "tiktok"
    }

    fn category(&self) -> HandlerCategory {
        HandlerCategory::Priority
    }

    async fn try_handle(&self, env: &MessageEnvelope) -> Result<bool> {
        let Some(link) = first_link(&env.raw_text) else {
            return Ok(false);
        };

        let chat_id = ChatId(env.chat_id);
        let reply = ReplyParameters::new(MessageId(env.message_id));

        info!("chat {}: resolving tiktok link {}", env.chat_id, link);

        let play_url = match self.resolve(&link).await {
            Ok(resp) if resp.code == 0 => resp.data.and_then(|d| {
                d.play
                    .filter(|p| !p.is_empty())
                    .and_then(|p| Url::parse(&p).ok().map(|u| (u, d.title)))
            }),
            Ok(resp) => {
                warn!("tikwm rejected link: code={} msg={}", resp.code, resp.msg);
                None
            }
            Err(err) => {
                warn!("tikwm request failed: {}", err);
                None
            }
        };

        match play_url {
            Some((url, title)) => {
                let mut req = self.bot.send_video(chat_id, InputFile::url(url));
                if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
                    req = req.caption(title);
                }
                req.reply_parameters(reply).await?;
            }
            None => {
                self.bot
                    .send_message(chat_id, "Maaf, videonya tidak bisa diunduh.")
                    .reply_parameters(reply)
                    .await?;
            }
        }

        Ok(true)
    }
}

fn first_link(text: &str) -> Option<String> {
    TIKTOK_LINK.find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_detection() {
        assert_eq!(
            first_link("lihat ini https://vt.tiktok.com/ZS8abc/ lucu banget").as_deref(),
            Some("https://vt.tiktok.com/ZS8abc/")
        );
        assert!(first_link("https://www.tiktok.com/@user/video/123").is_some());
        assert!(first_link("https://youtube.com/watch?v=x").is_none());
        assert!(first_link("tiktok.com tanpa skema").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"code":0,"msg":"success","data":{"play":"https://cdn.tikwm.com/v/1.mp4","title":"kucing"}}"#;
        let resp: TikwmResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.code, 0);
        assert_eq!(resp.data.unwrap().play.as_deref(), Some("https://cdn.tikwm.com/v/1.mp4"));

        let raw = r#"{"code":-1,"msg":"Url parsing is failed"}"#;
        let resp: TikwmResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.code, -1);
        assert!(resp.data.is_none());
    }
}
