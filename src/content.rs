// src/content.rs
//! Page retrieval and body-text extraction.
//!
//! The monitored site renders article bodies inside `<section>` blocks; we
//! pull those out, strip tags, decode entities, and cap the length before
//! handing the text to the oracle.

use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;

/// Front-page HTML cap before prompting (keeps the oracle under token limits).
pub const FRONT_PAGE_MAX_CHARS: usize = 20_000;
/// Article body-text cap before prompting.
pub const ARTICLE_TEXT_MAX_CHARS: usize = 4_000;

#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain reqwest fetcher with explicit timeouts.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("article-stance-notifier/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building page fetcher HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("fetching {url}"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?;
        resp.text().await.with_context(|| format!("reading body of {url}"))
    }
}

/// Concatenated text of all `<section>` blocks, tags stripped and entities
/// decoded, capped at [`ARTICLE_TEXT_MAX_CHARS`]. Empty when the page has no
/// sections.
pub fn section_text(html: &str) -> String {
    static RE_SECTION: OnceCell<Regex> = OnceCell::new();
    let re_section =
        RE_SECTION.get_or_init(|| Regex::new(r"(?is)<section[^>]*>(.*?)</section>").unwrap());
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    static RE_BLANK: OnceCell<Regex> = OnceCell::new();
    let re_blank = RE_BLANK.get_or_init(|| Regex::new(r"\n{2,}").unwrap());

    let mut parts = Vec::new();
    for cap in re_section.captures_iter(html) {
        let inner = &cap[1];
        // Keep block boundaries as newlines before stripping the tags.
        let with_breaks = inner
            .replace("<br>", "\n")
            .replace("<br/>", "\n")
            .replace("</p>", "\n")
            .replace("</div>", "\n");
        let stripped = re_tags.replace_all(&with_breaks, "");
        let decoded = html_escape::decode_html_entities(&stripped).to_string();
        let trimmed = decoded.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
    }

    let joined = parts.join("\n");
    let collapsed = re_blank.replace_all(&joined, "\n").to_string();
    truncate_chars(&collapsed, ARTICLE_TEXT_MAX_CHARS)
}

/// Char-count truncation (not bytes; article text is CJK-heavy).
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_text_strips_tags_and_decodes_entities() {
        let html = "<html><body>\
            <section><p>第一段&nbsp;内容</p><p>第二段</p></section>\
            <section>尾声 <b>重点</b></section>\
            </body></html>";
        let text = section_text(html);
        assert!(text.contains("第一段\u{a0}内容"));
        assert!(text.contains("第二段"));
        assert!(text.contains("尾声 重点"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn section_text_empty_without_sections() {
        assert_eq!(section_text("<div>no sections here</div>"), "");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let s = "一二三四五";
        assert_eq!(truncate_chars(s, 3), "一二三");
        assert_eq!(truncate_chars(s, 10), s);
    }
}
