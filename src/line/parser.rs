//! Parser stages that extract metadata from raw log lines.

use regex::Regex;

use super::LogLine;

/// Context value the server logs when a line has no unit of work attached.
pub const NO_CONTEXT: &str = "<No context>";

/// Structured metadata pattern: `<timestamp>,<priority>,<context> ~~> <message>`.
const METADATA_PATTERN: &str = r"(.*),(.*),(.*) ~~> (.*)";

/// A parser stage failed instead of passing the line through.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Parser stage {stage} failed: {reason}")]
pub struct ParseError {
    /// Name of the failing stage.
    pub stage: String,
    /// What went wrong.
    pub reason: String,
}

/// One stage of the parser chain.
///
/// Stages receive the previous stage's output and return a refined record.
/// A stage that does not recognize the shape of a line must return it
/// unchanged rather than fail.
pub trait LineParser: Send + Sync {
    /// Stage name used in diagnostics.
    fn name(&self) -> &str;

    /// Refine `line`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the stage itself is broken.
    fn parse(&self, line: LogLine) -> Result<LogLine, ParseError>;
}

/// Reads the structured metadata prefix of server log lines.
#[derive(Debug, Clone)]
pub struct MetadataParser {
    regex: Regex,
}

impl MetadataParser {
    /// Create a parser for the standard metadata prefix.
    ///
    /// # Panics
    ///
    /// Never in practice: the pattern is a compile-time constant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regex: Regex::new(METADATA_PATTERN).expect("metadata pattern is valid"),
        }
    }
}

impl Default for MetadataParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser for MetadataParser {
    fn name(&self) -> &str {
        "metadata"
    }

    fn parse(&self, line: LogLine) -> Result<LogLine, ParseError> {
        let Some(caps) = self.regex.captures(line.raw()) else {
            return Ok(line);
        };

        let timestamp = caps[1].to_string();
        let priority = caps[2].trim().to_string();
        let context = caps[3].trim().to_string();
        let message = caps[4].to_string();

        Ok(line
            .with_timestamp(timestamp)
            .with_priority(priority)
            .with_context(context)
            .with_message(message))
    }
}
