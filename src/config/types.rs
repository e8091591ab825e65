//! Configuration types.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Transport used for outbound notifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailerKind {
    /// Submit to an SMTP relay.
    #[default]
    Smtp,
    /// Print mails to stdout.
    Console,
}

/// SMTP relay settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upper bound on a single submission, in seconds.
    pub timeout_s: f64,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            username: None,
            password: None,
            timeout_s: 30.0,
        }
    }
}

/// Notification transport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MailerConfig {
    pub kind: MailerKind,
    pub smtp: SmtpSettings,
}

/// Error-burst alerting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ErrorBurstConfig {
    /// Seconds to keep collecting same-context lines after an error.
    pub extra_lines_delay_s: f64,
    /// Stop collecting early once this many extra lines arrived.
    pub max_lines: usize,
}

impl Default for ErrorBurstConfig {
    fn default() -> Self {
        Self {
            extra_lines_delay_s: 3.0,
            max_lines: 100,
        }
    }
}

impl ErrorBurstConfig {
    #[must_use]
    pub fn extra_lines_delay(&self) -> Duration {
        Duration::from_secs_f64(self.extra_lines_delay_s)
    }
}

/// Inactivity alerting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InactivityConfig {
    pub enabled: bool,
    /// Silence, in seconds, after which operators are notified.
    pub threshold_s: f64,
    /// How often, in seconds, the silence is checked.
    pub pinging_frequency_s: f64,
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_s: 10800.0,
            pinging_frequency_s: 300.0,
        }
    }
}

impl InactivityConfig {
    #[must_use]
    pub fn threshold(&self) -> Duration {
        Duration::from_secs_f64(self.threshold_s)
    }

    #[must_use]
    pub fn pinging_frequency(&self) -> Duration {
        Duration::from_secs_f64(self.pinging_frequency_s)
    }
}

/// Log file tailing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TailConfig {
    /// Delay between reads of the log file, in milliseconds.
    pub poll_interval_ms: u64,
    /// Replay the existing file content instead of starting at its end.
    pub from_start: bool,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            from_start: false,
        }
    }
}

impl TailConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Top-level monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentinelConfig {
    /// Name used in mail subjects. Derived from the log path when unset.
    pub service_name: Option<String>,
    /// Sender of every notification.
    pub from_address: String,
    /// Who receives notifications, in order.
    pub recipients: Vec<String>,
    /// Number of recent lines kept for context lookups.
    pub cache_capacity: usize,
    pub error_burst: ErrorBurstConfig,
    pub inactivity: InactivityConfig,
    pub mailer: MailerConfig,
    pub tail: TailConfig,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            service_name: None,
            from_address: "Log Monitoring <monitoring@localhost>".to_string(),
            recipients: Vec::new(),
            cache_capacity: 1000,
            error_burst: ErrorBurstConfig::default(),
            inactivity: InactivityConfig::default(),
            mailer: MailerConfig::default(),
            tail: TailConfig::default(),
        }
    }
}

impl SentinelConfig {
    /// Service name for mails about `log_path`: the configured name, or the
    /// path itself.
    #[must_use]
    pub fn service_name_for(&self, log_path: &Path) -> String {
        self.service_name
            .clone()
            .unwrap_or_else(|| log_path.display().to_string())
    }

    /// Check values that deserialize fine but make no sense at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(invalid("cache_capacity", "must be at least 1"));
        }
        check_seconds(
            "error_burst.extra_lines_delay_s",
            self.error_burst.extra_lines_delay_s,
        )?;
        check_seconds("inactivity.threshold_s", self.inactivity.threshold_s)?;
        check_seconds(
            "inactivity.pinging_frequency_s",
            self.inactivity.pinging_frequency_s,
        )?;
        check_seconds("mailer.smtp.timeout_s", self.mailer.smtp.timeout_s)?;
        if self.tail.poll_interval_ms == 0 {
            return Err(invalid("tail.poll_interval_ms", "must be at least 1"));
        }
        Ok(())
    }
}

fn check_seconds(field: &str, value: f64) -> Result<(), ConfigError> {
    if value <= 0.0 || value.is_nan() {
        return Err(invalid(field, "must be a positive number of seconds"));
    }
    if Duration::try_from_secs_f64(value).is_err() {
        return Err(invalid(field, "is too large to be a duration"));
    }
    Ok(())
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
