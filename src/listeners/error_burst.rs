//! Mails every log line of a context that logged an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ErrorBurstConfig;
use crate::line::{LogLine, NO_CONTEXT};
use crate::monitor::{Monitor, Observer, ObserverError};
use crate::notify::{templates, Notifier};

/// Priorities that trigger a report.
pub const ALERT_PRIORITIES: [&str; 2] = ["ERROR", "WARN"];

/// How long to keep collecting lines after an error.
pub const DEFAULT_EXTRA_LINES_DELAY: Duration = Duration::from_secs(3);

/// Stop collecting early after this many extra lines.
pub const DEFAULT_MAX_EXTRA_LINES: usize = 100;

/// Reports errors together with the rest of their context's logs.
///
/// An error line is usually followed right away by a stack trace logged
/// under the same context. On an `ERROR` or `WARN` line the listener grabs
/// the cached lines of that context, keeps collecting new ones for a short
/// while, and then mails everything as one report.
#[derive(Debug, Clone)]
pub struct ErrorBurstListener {
    notifier: Notifier,
    extra_lines_delay: Duration,
    max_extra_lines: usize,
}

impl ErrorBurstListener {
    #[must_use]
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            extra_lines_delay: DEFAULT_EXTRA_LINES_DELAY,
            max_extra_lines: DEFAULT_MAX_EXTRA_LINES,
        }
    }

    #[must_use]
    pub fn from_config(notifier: Notifier, config: &ErrorBurstConfig) -> Self {
        Self {
            notifier,
            extra_lines_delay: config.extra_lines_delay(),
            max_extra_lines: config.max_lines,
        }
    }

    #[must_use]
    pub fn with_extra_lines_delay(mut self, delay: Duration) -> Self {
        self.extra_lines_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_extra_lines(mut self, max: usize) -> Self {
        self.max_extra_lines = max;
        self
    }

    #[must_use]
    pub fn extra_lines_delay(&self) -> Duration {
        self.extra_lines_delay
    }

    /// Context to report on, if `line` should trigger a report.
    fn alert_context(line: &LogLine) -> Option<&str> {
        let priority = line.priority()?;
        if !ALERT_PRIORITIES.contains(&priority) {
            return None;
        }
        line.context().filter(|ctx| !ctx.is_empty() && *ctx != NO_CONTEXT)
    }
}

#[async_trait]
impl Observer for ErrorBurstListener {
    fn name(&self) -> &str {
        "error-burst"
    }

    async fn on_line(&self, line: &Arc<LogLine>, monitor: &Monitor) -> Result<(), ObserverError> {
        let Some(context) = Self::alert_context(line) else {
            return Ok(());
        };
        let context = context.to_string();

        let wanted = context.clone();
        let same_context = move |next: &LogLine| next.context() == Some(wanted.as_str());
        let mut context_lines = monitor.recent_matching(&same_context);

        tracing::info!(
            service = monitor.service_name(),
            context = %context,
            cached = context_lines.len(),
            "Error logged, collecting context"
        );

        let notifier = self.notifier.clone();
        let service = monitor.service_name().to_string();
        monitor.await_lines(
            self.max_extra_lines,
            self.extra_lines_delay,
            same_context,
            move |extra_lines| async move {
                context_lines.extend(extra_lines);
                let (subject, body) = templates::error_report(&service, &context, &context_lines);
                notifier
                    .notify(&subject, &body)
                    .await
                    .map_err(ObserverError::from)
            },
        );

        Ok(())
    }
}
