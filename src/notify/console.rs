//! Console transport for development.

use std::io::{self, Write};

use async_trait::async_trait;
use chrono::Utc;
use owo_colors::OwoColorize;

use super::{Mail, Mailer, NotifyError};

/// Prints every mail to stdout instead of sending it. Fails only if stdout
/// cannot be flushed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, _from: &str, to: &[String], mail: &Mail) -> Result<(), NotifyError> {
        let ts = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string();
        println!(
            "{} {} {} -> {}",
            ts.dimmed(),
            "[MAIL]".yellow().bold(),
            mail.subject.bold(),
            to.join(", ").cyan()
        );
        println!("{}", mail.render());
        io::stdout()
            .flush()
            .map_err(|e| NotifyError::Transport(format!("stdout: {e}")))?;
        Ok(())
    }
}
