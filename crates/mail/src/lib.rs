//! Outgoing mail for CleanCycle.
//!
//! [`Mailer`] is the seam the rest of the backend talks to. [`SmtpMailer`]
//! delivers through an SMTP relay with lettre, [`MemoryMailer`] keeps
//! messages in memory for development and tests.

use std::sync::Arc;

use async_trait::async_trait;
use cleancycle_config::MailConfig;
use thiserror::Error;
use tracing::info;

mod memory;
mod smtp;
pub mod templates;

pub use memory::MemoryMailer;
pub use smtp::SmtpMailer;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("smtp transport error: {0}")]
    Transport(String),
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

impl OutgoingMail {
    pub fn text(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            text: body.into(),
            html: None,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

pub type SharedMailer = Arc<dyn Mailer>;

/// SMTP when `mail.enabled`, otherwise the in-memory mailer.
pub fn build_mailer(config: &MailConfig) -> Result<SharedMailer, MailError> {
    if config.enabled {
        let mailer = SmtpMailer::from_config(config)?;
        info!(host = %config.smtp_host, port = config.smtp_port, "smtp mailer configured");
        Ok(Arc::new(mailer))
    } else {
        info!("mail delivery disabled, keeping outgoing mail in memory");
        Ok(Arc::new(MemoryMailer::new()))
    }
}
