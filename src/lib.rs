// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod cache;
pub mod config;
pub mod content;
pub mod extract;
pub mod notify;
pub mod oracle;
pub mod pipeline;
pub mod registry;

// ---- Re-exports for stable public API ----
pub use crate::cache::ContentCache;
pub use crate::config::Settings;
pub use crate::extract::{ArticleRef, EntityMention, ExtractionError, Sentiment, Stance};
pub use crate::notify::{fan_out, DeliveryOutcome, Messenger};
pub use crate::pipeline::{Pipeline, RunReport};
pub use crate::registry::SubscriberRegistry;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Shared tracing bootstrap for both binaries. `RUST_LOG` wins; the default
/// keeps our own spans at info.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("article_stance_notifier=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}
