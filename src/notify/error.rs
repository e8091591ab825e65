//! Notification error types.

/// Errors that can occur while sending a notification.
#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    /// Nobody to send to.
    #[error("No recipients configured")]
    NoRecipients,

    /// A sender or recipient address could not be parsed.
    #[error("Invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled.
    #[error("Failed to build mail: {0}")]
    Build(#[from] lettre::error::Error),

    /// The relay rejected the message or could not be reached.
    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Any other transport failure.
    #[error("Notification transport failed: {0}")]
    Transport(String),
}
