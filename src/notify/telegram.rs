// src/notify/telegram.rs
//! Telegram Bot API client: sendMessage for fan-out, plus the long-poll and
//! command-menu endpoints used by the listener binary.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use super::Messenger;

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    token: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Serialize)]
pub struct BotCommand {
    pub command: &'static str,
    pub description: &'static str,
}

impl TelegramClient {
    pub fn new(token: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("article-stance-notifier/0.1")
            .connect_timeout(Duration::from_secs(4))
            .build()
            .context("building Telegram HTTP client")?;
        Ok(Self {
            http,
            token,
            timeout,
        })
    }

    fn url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let resp = self
            .http
            .post(self.url(method))
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Telegram {method} request failed"))?
            .error_for_status()
            .with_context(|| format!("Telegram {method} returned an error status"))?;

        let body: ApiResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("decoding Telegram {method} response"))?;
        if !body.ok {
            return Err(anyhow!(
                "Telegram {method} rejected: {}",
                body.description.unwrap_or_else(|| "unknown error".into())
            ));
        }
        body.result
            .ok_or_else(|| anyhow!("Telegram {method} returned no result"))
    }

    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let payload = serde_json::json!({ "chat_id": chat_id, "text": text });
        let _: serde_json::Value = self.call("sendMessage", &payload, self.timeout).await?;
        Ok(())
    }

    /// Long poll for updates past `offset`. The HTTP timeout is stretched
    /// past the poll window so the server-side wait does not trip it.
    pub async fn get_updates(&self, offset: i64, poll_secs: u64) -> Result<Vec<Update>> {
        let payload = serde_json::json!({ "offset": offset, "timeout": poll_secs });
        self.call(
            "getUpdates",
            &payload,
            Duration::from_secs(poll_secs + 10),
        )
        .await
    }

    /// Register the command menu shown in the Telegram UI.
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let payload = serde_json::json!({ "commands": commands });
        let _: serde_json::Value = self.call("setMyCommands", &payload, self.timeout).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Messenger for TelegramClient {
    async fn send(&self, recipient: &str, text: &str) -> Result<()> {
        self.send_message(recipient, text).await
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
