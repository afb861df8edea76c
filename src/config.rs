// src/config.rs
//! Runtime settings from environment variables (with `.env` support loaded
//! by the binaries). Only the two API credentials are mandatory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_WATCH_URL: &str = "https://www.maobidao.net/";
const DEFAULT_CACHE_DIR: &str = "article_html_cache";
const DEFAULT_SUBSCRIBERS_PATH: &str = "chat_ids.txt";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Settings {
    pub watch_url: String,
    pub openai_api_key: String,
    pub openai_model: Option<String>,
    pub telegram_bot_token: String,
    pub cache_dir: PathBuf,
    pub subscribers_path: PathBuf,
    pub http_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let openai_api_key =
            std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        let telegram_bot_token =
            std::env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN is not set")?;

        let timeout_secs = match std::env::var("HTTP_TIMEOUT_SECS") {
            Ok(v) => v
                .parse::<u64>()
                .context("HTTP_TIMEOUT_SECS must be an integer")?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            watch_url: std::env::var("WATCH_URL")
                .unwrap_or_else(|_| DEFAULT_WATCH_URL.to_string()),
            openai_api_key,
            openai_model: std::env::var("OPENAI_MODEL").ok(),
            telegram_bot_token,
            cache_dir: std::env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR)),
            subscribers_path: std::env::var("SUBSCRIBERS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SUBSCRIBERS_PATH)),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[serial_test::serial]
    #[test]
    fn defaults_apply_when_optional_vars_unset() {
        env::set_var("OPENAI_API_KEY", "k");
        env::set_var("TELEGRAM_BOT_TOKEN", "t");
        env::remove_var("WATCH_URL");
        env::remove_var("OPENAI_MODEL");
        env::remove_var("CACHE_DIR");
        env::remove_var("SUBSCRIBERS_PATH");
        env::remove_var("HTTP_TIMEOUT_SECS");

        let s = Settings::from_env().unwrap();
        assert_eq!(s.watch_url, DEFAULT_WATCH_URL);
        assert_eq!(s.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(s.subscribers_path, PathBuf::from(DEFAULT_SUBSCRIBERS_PATH));
        assert_eq!(s.http_timeout, Duration::from_secs(10));
        assert!(s.openai_model.is_none());
    }

    #[serial_test::serial]
    #[test]
    fn missing_credentials_fail() {
        env::remove_var("OPENAI_API_KEY");
        env::set_var("TELEGRAM_BOT_TOKEN", "t");
        assert!(Settings::from_env().is_err());
    }
}
