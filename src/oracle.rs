// src/oracle.rs
//! Text-generation oracle abstraction + OpenAI client.
//!
//! The oracle is a black box that takes instructions and returns free-form
//! text. Everything downstream treats that text as unreliable; see
//! `extract` for the tolerant parsing side.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    /// Run the instructions and return the raw completion text.
    async fn generate(&self, instructions: &str, max_tokens: u32) -> Result<String>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// OpenAI chat-completions client. Requires an API key; the model defaults
/// to gpt-4o-mini.
pub struct OpenAiOracle {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiOracle {
    pub fn new(api_key: String, model: Option<&str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("article-stance-notifier/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building oracle HTTP client")?;
        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or("gpt-4o-mini").to_string(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: String,
}

#[async_trait::async_trait]
impl Oracle for OpenAiOracle {
    async fn generate(&self, instructions: &str, max_tokens: u32) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(anyhow!("OPENAI_API_KEY is not set"));
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: instructions,
            }],
            // Deterministic output; we want extraction, not creativity.
            temperature: 0.0,
            max_tokens,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("oracle request failed")?
            .error_for_status()
            .context("oracle returned an error status")?;

        let body: Resp = resp.json().await.context("decoding oracle response")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("oracle response contained no choices"))?;
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
