//! Mail message, transport trait and recipient-aware notifier.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::NotifyError;

/// A plain-text mail ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    /// `From` header.
    pub from: String,
    /// `To` header, recipients joined with commas.
    pub to: String,
    /// `Subject` header.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl Mail {
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: &[String],
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.join(","),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Render headers and body as a single string.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\n\n{}",
            self.from, self.to, self.subject, self.body
        )
    }
}

/// Notification transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send `mail` from `from` to every address in `to`.
    ///
    /// # Errors
    ///
    /// Transport failures are returned to the caller, never swallowed.
    async fn send(&self, from: &str, to: &[String], mail: &Mail) -> Result<(), NotifyError>;
}

/// Sends mails from a fixed sender to a fixed recipient list.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    from: String,
    recipients: Vec<String>,
}

impl Notifier {
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
            recipients,
        }
    }

    #[must_use]
    pub fn from_address(&self) -> &str {
        &self.from
    }

    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Send a mail with the given subject and body to every recipient.
    ///
    /// # Errors
    ///
    /// Returns the transport's error.
    pub async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let mail = Mail::new(&self.from, &self.recipients, subject, body);
        tracing::debug!(
            subject = %mail.subject,
            recipients = self.recipients.len(),
            "Sending notification"
        );
        self.mailer.send(&self.from, &self.recipients, &mail).await
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("from", &self.from)
            .field("recipients", &self.recipients)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture {
        sent: Mutex<Vec<(String, Vec<String>, Mail)>>,
    }

    #[async_trait]
    impl Mailer for Capture {
        async fn send(&self, from: &str, to: &[String], mail: &Mail) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((from.to_string(), to.to_vec(), mail.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_mail_joins_recipients() {
        let to = vec!["a@example.com".to_string(), "b@example.com".to_string()];
        let mail = Mail::new("ops@example.com", &to, "subject", "body");
        assert_eq!(mail.to, "a@example.com,b@example.com");
        assert_eq!(
            mail.render(),
            "From: ops@example.com\nTo: a@example.com,b@example.com\nSubject: subject\n\nbody"
        );
    }

    #[tokio::test]
    async fn test_notifier_addresses_all_recipients() {
        let capture = Arc::new(Capture::default());
        let recipients = vec!["a@example.com".to_string(), "b@example.com".to_string()];
        let notifier = Notifier::new(capture.clone(), "ops@example.com", recipients.clone());

        notifier.notify("hello", "world").await.unwrap();

        let sent = capture.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (from, to, mail) = &sent[0];
        assert_eq!(from, "ops@example.com");
        assert_eq!(to, &recipients);
        assert_eq!(mail.subject, "hello");
        assert_eq!(mail.body, "world");
    }
}
