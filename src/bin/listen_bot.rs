//! Long-running subscriber listener. Polls Telegram for updates and maps
//! them onto the shared subscriber store:
//!   /start        → subscribe
//!   /stop         → unsubscribe
//!   anything else → subscribe + acknowledge
//!
//! The pipeline binary only reads the store, so the flat-file rewrite in the
//! registry is the only coordination the two processes need.

use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use article_stance_notifier::notify::telegram::{BotCommand, TelegramClient, Update};
use article_stance_notifier::{Settings, SubscriberRegistry};

const POLL_SECS: u64 = 30;
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    article_stance_notifier::init_tracing();

    let settings = Settings::from_env()?;
    let client = TelegramClient::new(
        settings.telegram_bot_token.clone(),
        settings.http_timeout,
    )?;
    let registry = SubscriberRegistry::new(&settings.subscribers_path);

    client
        .set_my_commands(&[
            BotCommand {
                command: "start",
                description: "订阅新文章推送",
            },
            BotCommand {
                command: "stop",
                description: "退订新文章推送",
            },
        ])
        .await?;
    info!(store = %registry.path().display(), "listener started");

    let mut offset: i64 = 0;
    loop {
        let updates = match client.get_updates(offset, POLL_SECS).await {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "getUpdates failed, backing off");
                tokio::time::sleep(ERROR_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            if let Err(e) = handle_update(&client, &registry, &update).await {
                // One bad update must not take the listener down.
                error!(update_id = update.update_id, error = %e, "update handling failed");
            }
        }
    }
}

async fn handle_update(
    client: &TelegramClient,
    registry: &SubscriberRegistry,
    update: &Update,
) -> Result<()> {
    let Some(message) = &update.message else {
        return Ok(());
    };
    let chat_id = message.chat.id.to_string();
    let text = message.text.as_deref().unwrap_or_default();

    let reply = match text.trim() {
        "/start" => {
            if registry.add(&chat_id)? {
                "你好，你的 chat_id 已保存，将收到新文章推送！"
            } else {
                "你已订阅过了，无需重复订阅。"
            }
        }
        "/stop" => {
            if registry.remove(&chat_id)? {
                "已退订，将不再接收推送。"
            } else {
                "你尚未订阅。"
            }
        }
        _ => {
            registry.add(&chat_id)?;
            "已收到你的消息，chat_id 已保存！"
        }
    };

    client.send_message(&chat_id, reply).await
}
