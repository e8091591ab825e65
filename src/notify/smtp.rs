//! SMTP relay transport.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpSettings;

use super::{Mail, Mailer, NotifyError};

/// Submits mail to an SMTP relay.
///
/// The connection is plain SMTP, matching a relay on localhost or inside a
/// private network. Unreachable relays surface as [`NotifyError::Smtp`].
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailer {
    /// Create a mailer for the relay described by `settings`.
    #[must_use]
    pub fn new(settings: &SmtpSettings) -> Self {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            .port(settings.port)
            .timeout(Some(Duration::from_secs_f64(settings.timeout_s)));

        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Self {
            transport: builder.build(),
            host: settings.host.clone(),
        }
    }

    /// Relay host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    fn build_message(from: &str, to: &[String], mail: &Mail) -> Result<Message, NotifyError> {
        if to.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(from.parse::<Mailbox>()?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN);
        for addr in to {
            builder = builder.to(addr.parse::<Mailbox>()?);
        }

        Ok(builder.body(mail.body.clone())?)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, from: &str, to: &[String], mail: &Mail) -> Result<(), NotifyError> {
        let message = Self::build_message(from, to, mail)?;
        self.transport.send(message).await?;
        tracing::info!(host = %self.host, subject = %mail.subject, "Mail submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &[String]) -> Mail {
        Mail::new("Monitoring <monitoring@example.com>", to, "subject", "body")
    }

    #[test]
    fn test_build_message_requires_recipients() {
        let result = SmtpMailer::build_message("monitoring@example.com", &[], &mail(&[]));
        assert!(matches!(result, Err(NotifyError::NoRecipients)));
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let to = vec!["not an address".to_string()];
        let result = SmtpMailer::build_message("monitoring@example.com", &to, &mail(&to));
        assert!(matches!(result, Err(NotifyError::Address(_))));
    }

    #[test]
    fn test_build_message_accepts_named_mailboxes() {
        let to = vec![
            "Ops <ops@example.com>".to_string(),
            "dev@example.com".to_string(),
        ];
        let message = SmtpMailer::build_message(
            "Monitoring <monitoring@example.com>",
            &to,
            &mail(&to),
        )
        .unwrap();
        assert_eq!(message.envelope().to().len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_relay_propagates() {
        let settings = SmtpSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            timeout_s: 1.0,
            ..SmtpSettings::default()
        };
        let mailer = SmtpMailer::new(&settings);
        let to = vec!["ops@example.com".to_string()];
        let result = mailer
            .send("monitoring@example.com", &to, &mail(&to))
            .await;
        assert!(matches!(result, Err(NotifyError::Smtp(_))));
    }
}
