// src/notify/mod.rs
//! Notification fan-out: one message, every subscriber, failures isolated.

pub mod telegram;

use anyhow::Result;
use tracing::{info, warn};

#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, recipient: &str, text: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Per-recipient delivery record, kept for the operator audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub recipient: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Deliver `text` to every recipient. One recipient's failure (blocked bot,
/// invalid id, timeout) never blocks the rest; no retries within a run.
/// Overall success means "attempted all", not "delivered all".
pub async fn fan_out(
    messenger: &dyn Messenger,
    recipients: &[String],
    text: &str,
) -> Vec<DeliveryOutcome> {
    let mut outcomes = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        match messenger.send(recipient, text).await {
            Ok(()) => {
                info!(recipient, messenger = messenger.name(), "delivered");
                outcomes.push(DeliveryOutcome {
                    recipient: recipient.clone(),
                    success: true,
                    error: None,
                });
            }
            Err(e) => {
                warn!(recipient, messenger = messenger.name(), error = %e, "delivery failed");
                outcomes.push(DeliveryOutcome {
                    recipient: recipient.clone(),
                    success: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    let failed = outcomes.iter().filter(|o| !o.success).count();
    info!(
        attempted = outcomes.len(),
        failed,
        "fan-out complete"
    );
    outcomes
}
