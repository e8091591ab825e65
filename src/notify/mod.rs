//! Outbound notifications.
//!
//! Alerts are plain-text mails handed to a [`Mailer`] transport. The
//! [`Notifier`] carries the sender address and recipient list so observers
//! only need to supply a subject and a body.

mod console;
mod error;
mod mail;
mod smtp;
pub mod templates;

pub use console::ConsoleMailer;
pub use error::NotifyError;
pub use mail::{Mail, Mailer, Notifier};
pub use smtp::SmtpMailer;
