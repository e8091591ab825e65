//! Parsed log line record.

use std::fmt;

/// A single line from the logs plus the metadata parsers extracted from it.
///
/// Records are never mutated once handed out. Parser stages refine a record
/// by consuming it and returning a new one through the `with_*` builders, so
/// any `Arc<LogLine>` already shared with observers stays unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    raw: String,
    message: String,
    timestamp: Option<String>,
    priority: Option<String>,
    context: Option<String>,
}

impl LogLine {
    /// Create an unparsed record. The message defaults to the raw text.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            message: raw.clone(),
            raw,
            timestamp: None,
            priority: None,
            context: None,
        }
    }

    /// The full line as read from the source.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Everything in the line that isn't metadata.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    /// Priority as logged by the server, e.g. `ERROR` or `INFO`.
    #[must_use]
    pub fn priority(&self) -> Option<&str> {
        self.priority.as_deref()
    }

    /// Identifier of the unit of work that produced the line.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Check whether the raw line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.raw.contains(needle)
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.timestamp.as_deref().unwrap_or("-"),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults_message_to_raw() {
        let line = LogLine::new("Herpy derp derp derp");
        assert_eq!(line.raw(), "Herpy derp derp derp");
        assert_eq!(line.message(), "Herpy derp derp derp");
        assert!(line.timestamp().is_none());
        assert!(line.priority().is_none());
        assert!(line.context().is_none());
    }

    #[test]
    fn test_builders_leave_original_untouched() {
        let original = LogLine::new("raw text");
        let refined = original
            .clone()
            .with_priority("ERROR")
            .with_context("job-1")
            .with_message("text");

        assert_eq!(original.priority(), None);
        assert_eq!(refined.priority(), Some("ERROR"));
        assert_eq!(refined.context(), Some("job-1"));
        assert_eq!(refined.message(), "text");
        assert_eq!(refined.raw(), "raw text");
    }

    #[test]
    fn test_display_uses_timestamp_and_message() {
        let line = LogLine::new("x").with_timestamp("03/29 18:25").with_message("boom");
        assert_eq!(line.to_string(), "03/29 18:25 boom");
        assert_eq!(LogLine::new("plain").to_string(), "- plain");
    }
}
