//! Alerts when the log source goes quiet.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::InactivityConfig;
use crate::line::LogLine;
use crate::monitor::{Monitor, Observer, ObserverError};
use crate::notify::{templates, Notifier};

/// Silence after which operators are notified.
pub const DEFAULT_INACTIVITY_THRESHOLD: Duration = Duration::from_secs(3 * 3600);

/// How often the silence is checked.
pub const DEFAULT_PINGING_FREQUENCY: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct Shared {
    notifier: Notifier,
    service_name: String,
    threshold: Duration,
    pinging_frequency: Duration,
    last_line: Mutex<Instant>,
}

impl Shared {
    fn last_line(&self) -> MutexGuard<'_, Instant> {
        self.last_line.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Notifies operators when no line arrived for `threshold`.
///
/// The listener does nothing until [`start`](Self::start) is called. While
/// started it checks every `pinging_frequency` how long ago the last line
/// arrived. After an alert the silence is measured again from the alert, so
/// a dead log produces one mail per `threshold` rather than one per check.
#[derive(Debug)]
pub struct InactivityListener {
    shared: Arc<Shared>,
    checker: Mutex<Option<CancellationToken>>,
}

impl InactivityListener {
    #[must_use]
    pub fn new(notifier: Notifier, service_name: impl Into<String>) -> Self {
        Self::with_timing(
            notifier,
            service_name,
            DEFAULT_INACTIVITY_THRESHOLD,
            DEFAULT_PINGING_FREQUENCY,
        )
    }

    #[must_use]
    pub fn from_config(
        notifier: Notifier,
        service_name: impl Into<String>,
        config: &InactivityConfig,
    ) -> Self {
        Self::with_timing(
            notifier,
            service_name,
            config.threshold(),
            config.pinging_frequency(),
        )
    }

    #[must_use]
    pub fn with_timing(
        notifier: Notifier,
        service_name: impl Into<String>,
        threshold: Duration,
        pinging_frequency: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                notifier,
                service_name: service_name.into(),
                threshold,
                pinging_frequency,
                last_line: Mutex::new(Instant::now()),
            }),
            checker: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn threshold(&self) -> Duration {
        self.shared.threshold
    }

    #[must_use]
    pub fn pinging_frequency(&self) -> Duration {
        self.shared.pinging_frequency
    }

    fn checker(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.checker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begin checking for silence, counting from now.
    ///
    /// Starting a running listener restarts its schedule.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start(&self) {
        *self.shared.last_line() = Instant::now();

        let cancel = CancellationToken::new();
        if let Some(previous) = self.checker().replace(cancel.clone()) {
            previous.cancel();
        }

        tracing::debug!(
            service = %self.shared.service_name,
            threshold = ?self.shared.threshold,
            every = ?self.shared.pinging_frequency,
            "Inactivity checks started"
        );
        tokio::spawn(watch_silence(Arc::clone(&self.shared), cancel));
    }

    /// Stop checking. Safe to call repeatedly or before `start`.
    pub fn stop(&self) {
        if let Some(cancel) = self.checker().take() {
            cancel.cancel();
            tracing::debug!(service = %self.shared.service_name, "Inactivity checks stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.checker().is_some()
    }
}

impl Drop for InactivityListener {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn watch_silence(shared: Arc<Shared>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(shared.pinging_frequency) => {}
        }

        let silent_for = shared.last_line().elapsed();
        if silent_for < shared.threshold {
            continue;
        }

        tracing::warn!(
            service = %shared.service_name,
            silent_for = ?silent_for,
            "Nothing logged within threshold"
        );
        let (subject, body) = templates::inactivity(&shared.service_name, shared.threshold);
        if let Err(err) = shared.notifier.notify(&subject, &body).await {
            tracing::error!(
                service = %shared.service_name,
                error = %err,
                "Failed to send inactivity notification"
            );
        }
        *shared.last_line() = Instant::now();
    }
}

#[async_trait]
impl Observer for InactivityListener {
    fn name(&self) -> &str {
        "inactivity"
    }

    async fn on_line(&self, _line: &Arc<LogLine>, _monitor: &Monitor) -> Result<(), ObserverError> {
        *self.shared.last_line() = Instant::now();
        Ok(())
    }
}
