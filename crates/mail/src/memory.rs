use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::{MailError, Mailer, OutgoingMail};

/// Keeps every message in memory. Clones share the same outbox.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<OutgoingMail>>>,
    fail_with: Option<String>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every delivery fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outbox: Arc::default(),
            fail_with: Some(reason.into()),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    pub fn last_to(&self, address: &str) -> Option<OutgoingMail> {
        self.sent().into_iter().rev().find(|mail| mail.to == address)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if let Some(reason) = &self.fail_with {
            return Err(MailError::Transport(reason.clone()));
        }

        info!(to = %mail.to, subject = %mail.subject, "queued mail in memory outbox");
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(mail.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_outbox() {
        let mailer = MemoryMailer::new();
        let handle = mailer.clone();

        mailer
            .send(&OutgoingMail::text("a@example.com", "Hi", "Body"))
            .await
            .unwrap();

        assert_eq!(handle.sent().len(), 1);
        assert_eq!(handle.last_to("a@example.com").unwrap().subject, "Hi");
        assert!(handle.last_to("b@example.com").is_none());
    }

    #[tokio::test]
    async fn failing_mailer_reports_transport_error() {
        let mailer = MemoryMailer::failing("relay down");
        let err = mailer
            .send(&OutgoingMail::text("a@example.com", "Hi", "Body"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Transport(reason) if reason == "relay down"));
        assert!(mailer.sent().is_empty());
    }
}
