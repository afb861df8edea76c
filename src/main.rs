//! Run-once pipeline binary: meant to be invoked by an external scheduler
//! (cron or similar), not to stay resident. State between runs lives only in
//! the content cache and the subscriber store.

use anyhow::Result;
use tracing::info;

use article_stance_notifier::content::HttpFetcher;
use article_stance_notifier::notify::telegram::TelegramClient;
use article_stance_notifier::oracle::OpenAiOracle;
use article_stance_notifier::{ContentCache, Pipeline, Settings, SubscriberRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when the vars come from the environment.
    let _ = dotenvy::dotenv();
    article_stance_notifier::init_tracing();

    let settings = Settings::from_env()?;

    let fetcher = HttpFetcher::new(settings.http_timeout)?;
    let oracle = OpenAiOracle::new(
        settings.openai_api_key.clone(),
        settings.openai_model.as_deref(),
        settings.http_timeout,
    )?;
    let messenger = TelegramClient::new(
        settings.telegram_bot_token.clone(),
        settings.http_timeout,
    )?;
    let cache = ContentCache::new(&settings.cache_dir);
    let registry = SubscriberRegistry::new(&settings.subscribers_path);

    let pipeline = Pipeline {
        site_url: &settings.watch_url,
        oracle: &oracle,
        fetcher: &fetcher,
        messenger: &messenger,
        cache: &cache,
        registry: &registry,
    };

    let report = pipeline.run_once().await?;
    let delivered = report.outcomes.iter().filter(|o| o.success).count();
    info!(
        title = %report.article.title,
        mentions = report.mentions.len(),
        attempted = report.outcomes.len(),
        delivered,
        "run complete"
    );
    Ok(())
}
