// tests/fanout_isolation.rs
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use article_stance_notifier::{fan_out, Messenger};

/// Fails for one specific recipient, records everything it was asked to send.
struct FlakyMessenger {
    fail_for: &'static str,
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Messenger for FlakyMessenger {
    async fn send(&self, recipient: &str, text: &str) -> Result<()> {
        if recipient == self.fail_for {
            return Err(anyhow!("bot was blocked by the user"));
        }
        self.sent.lock().unwrap().push(format!("{recipient}:{text}"));
        Ok(())
    }
    fn name(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn one_failing_recipient_does_not_block_the_rest() {
    let messenger = FlakyMessenger {
        fail_for: "B",
        sent: Mutex::new(Vec::new()),
    };
    let recipients: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();

    let outcomes = fan_out(&messenger, &recipients, "hello").await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].success);
    assert!(!outcomes[1].success);
    assert!(outcomes[2].success);
    assert_eq!(outcomes[1].recipient, "B");
    assert!(outcomes[1]
        .error
        .as_deref()
        .unwrap()
        .contains("blocked"));

    let sent = messenger.sent.lock().unwrap();
    assert_eq!(*sent, vec!["A:hello".to_string(), "C:hello".to_string()]);
}

#[tokio::test]
async fn no_recipients_means_no_outcomes() {
    let messenger = FlakyMessenger {
        fail_for: "",
        sent: Mutex::new(Vec::new()),
    };
    let outcomes = fan_out(&messenger, &[], "hello").await;
    assert!(outcomes.is_empty());
    assert!(messenger.sent.lock().unwrap().is_empty());
}
