// src/pipeline.rs
//! The run-once pipeline: locate the newest article, fetch/cache its body,
//! extract entity mentions, format the notification, fan out.
//!
//! Linear state machine, no back-edges:
//! LocateLatest → FetchContent → ExtractEntities → FormatMessage →
//! LoadSubscribers → FanOut → Done.
//!
//! Failure policy: anything that prevents a meaningful notification (front
//! page fetch, locate oracle call, article extraction, body fetch, registry
//! read) aborts the run. Mention extraction only degrades: the article-only
//! notification still goes out.

use anyhow::{Context, Result};
use chrono::{FixedOffset, Utc};
use tracing::{info, warn};

use crate::cache::ContentCache;
use crate::content::{self, PageFetcher, FRONT_PAGE_MAX_CHARS};
use crate::extract::{self, ArticleRef, EntityMention};
use crate::notify::{self, DeliveryOutcome, Messenger};
use crate::oracle::Oracle;
use crate::registry::SubscriberRegistry;

const LOCATE_MAX_TOKENS: u32 = 300;
const MENTIONS_MAX_TOKENS: u32 = 4096;

pub struct Pipeline<'a> {
    pub site_url: &'a str,
    pub oracle: &'a dyn Oracle,
    pub fetcher: &'a dyn PageFetcher,
    pub messenger: &'a dyn Messenger,
    pub cache: &'a ContentCache,
    pub registry: &'a SubscriberRegistry,
}

#[derive(Debug)]
pub struct RunReport {
    pub article: ArticleRef,
    pub mentions: Vec<EntityMention>,
    /// Empty both when there were no subscribers and when fan-out was
    /// skipped; check the log for which.
    pub outcomes: Vec<DeliveryOutcome>,
}

impl Pipeline<'_> {
    pub async fn run_once(&self) -> Result<RunReport> {
        // LocateLatest
        let front = self
            .fetcher
            .fetch(self.site_url)
            .await
            .context("fetching front page")?;
        let prompt = locate_prompt(&content::truncate_chars(&front, FRONT_PAGE_MAX_CHARS));
        let raw = self
            .oracle
            .generate(&prompt, LOCATE_MAX_TOKENS)
            .await
            .context("locate-latest oracle call")?;
        let article = extract::latest_article(&raw).context("extracting latest article")?;
        info!(title = %article.title, url = %article.url, "located latest article");

        // FetchContent (cached, first-writer-wins)
        let body = self
            .cache
            .get_or_fetch(&article.url, || self.fetcher.fetch(&article.url))
            .await
            .context("fetching article body")?;

        // ExtractEntities (degrades to empty)
        let mentions = self.extract_mentions(&body).await;
        info!(count = mentions.len(), "entity mentions extracted");

        // FormatMessage
        let message = format_message(&article, &mentions);

        // LoadSubscribers
        let subscribers = self.registry.list_all().context("loading subscribers")?;
        if subscribers.is_empty() {
            info!("no subscribers registered, skipping fan-out");
            return Ok(RunReport {
                article,
                mentions,
                outcomes: Vec::new(),
            });
        }

        // FanOut
        let outcomes = notify::fan_out(self.messenger, &subscribers, &message).await;

        Ok(RunReport {
            article,
            mentions,
            outcomes,
        })
    }

    async fn extract_mentions(&self, body: &str) -> Vec<EntityMention> {
        let text = content::section_text(body);
        if text.trim().is_empty() {
            warn!("no section text in article body, skipping mention extraction");
            return Vec::new();
        }
        match self
            .oracle
            .generate(&mentions_prompt(&text), MENTIONS_MAX_TOKENS)
            .await
        {
            Ok(raw) => extract::entity_mentions(&raw),
            Err(e) => {
                warn!(error = %e, "mentions oracle call failed, continuing without mentions");
                Vec::new()
            }
        }
    }
}

/// Current Beijing time, the reference the oracle needs to resolve relative
/// dates on the page.
fn beijing_now() -> String {
    let tz = FixedOffset::east_opt(8 * 3600).unwrap();
    Utc::now().with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

fn locate_prompt(html: &str) -> String {
    format!(
        "你是一个帮助从网页HTML中提取文章信息的助手。\n\
         当前北京时间为：{now}\n\
         请从下面的HTML代码中，提取最新一篇文章的标题、链接和发布时间，\
         并以JSON格式返回（格式为{{\"title\": \"...\", \"url\": \"...\", \"time\": \"YYYY-MM-DD HH:mm\"}}）。\n\n\
         HTML内容如下：\n{html}\n\n只返回JSON结果，不要输出其他内容。",
        now = beijing_now(),
        html = html
    )
}

fn mentions_prompt(article_text: &str) -> String {
    format!(
        "你是专业的信息抽取助手。请从下面的文章内容中，提取所有被提及的A股上市公司名称。\
         对于每家被提及的公司，请判断作者对该公司的未来操作观点（买入/卖出/忽略），\
         注意忽略早期历史回顾，只抽取真正需要关注的公司。\
         同时给出作者在提及这个公司时的整体情绪（正面/负面/中性）。\n\
         返回格式要求如下：\n\
         - 字段 company：公司名称\n\
         - 字段 stance：未来操作观点，只能是“买入”“卖出”“忽略”之一\n\
         - 字段 sentiment：情绪，只能是“正面”“负面”“中性”之一\n\
         请以JSON数组返回（格式为：[{{\"company\": \"公司名\", \"stance\": \"买入/卖出/忽略\", \"sentiment\": \"正面/负面/中性\"}}, ...]）。\n\
         如文中未提及公司，请返回空数组 []。\n\
         只返回JSON数组，不要输出其他内容。\n\n\
         文章内容：\n{article_text}"
    )
}

/// Subscriber-facing notification text. Subscribers only ever see this, an
/// article-only variant of it, or nothing at all.
pub fn format_message(article: &ArticleRef, mentions: &[EntityMention]) -> String {
    let mut msg = format!(
        "📢 新文章提醒\n\n标题：{}\n链接：{}\n时间：{}\n",
        article.title,
        article.url,
        article.published_at.format("%Y-%m-%d %H:%M")
    );
    if mentions.is_empty() {
        msg.push_str("\n未检测到公司名。");
    } else {
        msg.push_str("\n文章涉及公司：\n");
        for m in mentions {
            msg.push_str(&format!(
                "- {} {}（情绪：{}）\n",
                m.stance, m.company, m.sentiment
            ));
        }
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Sentiment, Stance};
    use chrono::NaiveDate;

    fn article() -> ArticleRef {
        ArticleRef {
            title: "T".into(),
            url: "https://x/1".into(),
            published_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn message_lists_each_mention_once() {
        let mentions = vec![crate::extract::EntityMention {
            company: "甲公司".into(),
            stance: Stance::Buy,
            sentiment: Sentiment::Positive,
        }];
        let msg = format_message(&article(), &mentions);
        assert!(msg.contains("标题：T"));
        assert!(msg.contains("链接：https://x/1"));
        assert!(msg.contains("时间：2024-01-01 09:00"));
        assert_eq!(msg.matches("甲公司").count(), 1);
        assert!(msg.contains("- 买入 甲公司（情绪：正面）"));
    }

    #[test]
    fn message_notes_absence_of_mentions() {
        let msg = format_message(&article(), &[]);
        assert!(msg.contains("未检测到公司名"));
        assert!(!msg.contains("文章涉及公司"));
    }

    #[test]
    fn locate_prompt_embeds_truncated_html() {
        let p = locate_prompt("<html>首页</html>");
        assert!(p.contains("<html>首页</html>"));
        assert!(p.contains("只返回JSON结果"));
    }
}
