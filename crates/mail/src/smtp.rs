use async_trait::async_trait;
use cleancycle_config::MailConfig;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::{MailError, Mailer, OutgoingMail};

/// STARTTLS SMTP relay delivery.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|err| MailError::Transport(err.to_string()))?
            .port(config.smtp_port);

        if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        let from = parse_mailbox(&config.from_address, Some(config.from_name.clone()))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<Message, MailError> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&mail.to, None)?)
            .subject(mail.subject.clone());

        let message = match &mail.html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                mail.text.clone(),
                html.clone(),
            )),
            None => builder.singlepart(SinglePart::plain(mail.text.clone())),
        };

        message.map_err(|err| MailError::Build(err.to_string()))
    }
}

fn parse_mailbox(address: &str, name: Option<String>) -> Result<Mailbox, MailError> {
    let parsed = address.parse::<Address>().map_err(|err| {
        MailError::InvalidAddress {
            address: address.to_string(),
            reason: err.to_string(),
        }
    })?;
    Ok(Mailbox::new(name, parsed))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = self.build_message(mail)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;
        debug!(to = %mail.to, code = %response.code(), "smtp relay accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_recipient() {
        let mailer = SmtpMailer::from_config(&MailConfig::default()).unwrap();
        let err = mailer
            .build_message(&OutgoingMail::text("not-an-address", "Hi", "Body"))
            .unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress { .. }));
    }

    #[test]
    fn builds_alternative_message_with_named_sender() {
        let mailer = SmtpMailer::from_config(&MailConfig::default()).unwrap();
        let mail = OutgoingMail {
            to: "resident@example.com".to_string(),
            subject: "Verify".to_string(),
            text: "123456".to_string(),
            html: Some("<b>123456</b>".to_string()),
        };
        let message = mailer.build_message(&mail).unwrap();
        let rendered = String::from_utf8(message.formatted()).unwrap();
        assert!(rendered.contains("CleanCycle"));
        assert!(rendered.contains("noreply.cleancycle@gmail.com"));
        assert!(rendered.contains("multipart/alternative"));
    }
}
