//! The monitor: parses, caches and fans out lines.

use std::error::Error as _;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;

use crate::config::SentinelConfig;
use crate::line::{LineParser, LogLine, MetadataParser, ParseError};
use crate::notify::{templates, ConsoleMailer, Mailer, Notifier, NotifyError};

use super::error::panic_message;
use super::waiter::WindowedWaiter;
use super::{
    LineCache, MonitorError, Observer, ObserverError, ObserverFailure, ObserverId,
    ObserverRegistry, DEFAULT_CACHE_CAPACITY,
};

/// Sender used when no notifier is configured.
const DEFAULT_FROM_ADDRESS: &str = "Log Monitoring <monitoring@localhost>";

/// Predicate accepting every line.
#[must_use]
pub fn match_all(_line: &LogLine) -> bool {
    true
}

/// State guarded by the monitor's lock.
struct MonitorState {
    cache: LineCache,
    observers: ObserverRegistry,
}

struct Inner {
    service_name: String,
    parsers: Vec<Box<dyn LineParser>>,
    notifier: Notifier,
    state: Mutex<MonitorState>,
}

/// Central dispatcher for a single log source.
///
/// `Monitor` is a cheap handle: clones share the same cache, observers and
/// parser chain. Lines are expected from a single consumer, while windowed
/// wait timers may touch the monitor concurrently from their own tasks.
///
/// ```no_run
/// # async fn run(lines: Vec<String>) {
/// use std::sync::Arc;
/// use log_sentinel::listeners::ErrorBurstListener;
/// use log_sentinel::monitor::Monitor;
/// use log_sentinel::notify::{ConsoleMailer, Notifier};
///
/// let notifier = Notifier::new(Arc::new(ConsoleMailer::new()), "ops@example.com", vec![]);
/// let monitor = Monitor::builder("billing").notifier(notifier.clone()).build();
/// monitor.add_observer(Arc::new(ErrorBurstListener::new(notifier)));
///
/// for line in lines {
///     monitor.ingest_with_recovery(&line).await;
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<Inner>,
}

impl Monitor {
    /// Start building a monitor for `service_name`.
    #[must_use]
    pub fn builder(service_name: impl Into<String>) -> MonitorBuilder {
        MonitorBuilder::new(service_name)
    }

    /// Build a monitor from configuration, sending through `mailer`.
    #[must_use]
    pub fn from_config(
        config: &SentinelConfig,
        service_name: impl Into<String>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let notifier = Notifier::new(
            mailer,
            config.from_address.clone(),
            config.recipients.clone(),
        );
        Self::builder(service_name)
            .cache_capacity(config.cache_capacity)
            .notifier(notifier)
            .build()
    }

    /// Name of the monitored service, used in mail subjects.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    /// Notifier used for self-diagnostic mails.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an observer. It receives every line ingested from now on.
    pub fn add_observer(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = self.state().observers.add(observer);
        tracing::debug!(observer = %id, "Observer added");
        id
    }

    /// Unregister an observer. Removing a non-member is a no-op.
    ///
    /// Safe to call from inside [`Observer::on_line`]; the removal applies
    /// from the next line on.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let removed = self.state().observers.remove(id);
        if removed {
            tracing::debug!(observer = %id, "Observer removed");
        }
        removed
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.state().observers.len()
    }

    #[must_use]
    pub fn has_observer(&self, id: ObserverId) -> bool {
        self.state().observers.contains(id)
    }

    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.state().cache.capacity()
    }

    /// Copy of the cached lines, oldest first.
    #[must_use]
    pub fn cached_lines(&self) -> Vec<Arc<LogLine>> {
        self.state().cache.snapshot()
    }

    /// Cached lines accepted by `filter`, oldest first.
    ///
    /// Only looks at what is cached right now.
    pub fn recent_matching(&self, filter: impl Fn(&LogLine) -> bool) -> Vec<Arc<LogLine>> {
        let lines = self.cached_lines();
        lines
            .into_iter()
            .filter(|line| filter(line.as_ref()))
            .collect()
    }

    /// Wait for `count` lines accepted by `filter`, or for `timeout`.
    ///
    /// Returns immediately. `on_complete` runs exactly once with the lines
    /// collected so far: on the ingest path when the count is reached, or on
    /// a timer task when the deadline passes first. A `count` of zero always
    /// waits for the deadline. Errors from `on_complete` on the ingest path
    /// fail that ingest; on the timer path they are reported like an
    /// [`ingest_with_recovery`](Self::ingest_with_recovery) failure.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn await_lines<P, F, Fut>(
        &self,
        count: usize,
        timeout: Duration,
        filter: P,
        on_complete: F,
    ) -> ObserverId
    where
        P: Fn(&LogLine) -> bool + Send + Sync + 'static,
        F: FnOnce(Vec<Arc<LogLine>>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ObserverError>> + Send + 'static,
    {
        let id = ObserverId::new();
        let waiter = Arc::new(WindowedWaiter::new(
            id,
            count,
            Box::new(filter),
            Box::new(move |lines: Vec<Arc<LogLine>>| on_complete(lines).boxed()),
        ));

        self.state()
            .observers
            .insert(id, Arc::clone(&waiter) as Arc<dyn Observer>);
        waiter.arm(self.clone(), timeout);

        tracing::debug!(waiter = %id, count, ?timeout, "Awaiting lines");
        id
    }

    fn parse(&self, raw: &str) -> Result<LogLine, ParseError> {
        self.inner
            .parsers
            .iter()
            .try_fold(LogLine::new(raw), |line, parser| parser.parse(line))
    }

    /// Read one raw line.
    ///
    /// The line runs through the parser chain, is cached, then delivered to
    /// every observer registered when delivery starts, in registration
    /// order. A failing observer doesn't stop delivery to the others; all
    /// failures are returned together afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ParseStage`] if a parser stage failed (nothing
    /// is cached or delivered), or [`MonitorError::Observers`] if any
    /// observer failed or panicked.
    pub async fn ingest(&self, raw: &str) -> Result<(), MonitorError> {
        let line = Arc::new(self.parse(raw)?);

        let observers = {
            let mut state = self.state();
            state.cache.push(Arc::clone(&line));
            state.observers.snapshot()
        };

        let mut failures = Vec::new();
        for (id, observer) in observers {
            let outcome = AssertUnwindSafe(observer.on_line(&line, self))
                .catch_unwind()
                .await;
            let source = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(payload) => ObserverError::Panicked(panic_message(payload.as_ref())),
            };
            tracing::warn!(
                observer = observer.name(),
                %id,
                error = %source,
                "Observer failed"
            );
            failures.push(ObserverFailure {
                observer: observer.name().to_string(),
                id,
                source,
            });
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(MonitorError::Observers(failures))
        }
    }

    /// Read one raw line without ever failing.
    ///
    /// Errors and panics from [`ingest`](Self::ingest) are mailed to the
    /// operators. If that mail fails too, the failure is logged and dropped.
    pub async fn ingest_with_recovery(&self, raw: &str) {
        let result = match AssertUnwindSafe(self.ingest(raw)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(MonitorError::Panicked(panic_message(payload.as_ref()))),
        };

        if let Err(err) = result {
            self.recover(&err).await;
        }
    }

    /// Report `err` to the operators, logging if even that fails.
    pub(crate) async fn recover(&self, err: &MonitorError) {
        tracing::warn!(error = %err, "Monitoring failure, sending self-diagnostic");

        match AssertUnwindSafe(self.report_failure(err))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(report_err)) => {
                tracing::error!(
                    error = %err,
                    report_error = %report_err,
                    "Failed to report monitoring failure"
                );
            }
            Err(payload) => {
                tracing::error!(
                    error = %err,
                    panic = %panic_message(payload.as_ref()),
                    "Panicked while reporting monitoring failure"
                );
            }
        }
    }

    /// Mail a self-diagnostic describing `err` to the operators.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the mail could not be sent.
    pub async fn report_failure(&self, err: &MonitorError) -> Result<(), NotifyError> {
        let (subject, body) = templates::self_diagnostic(self.service_name(), &describe(err));
        self.inner.notifier.notify(&subject, &body).await
    }
}

/// Error text followed by its chain of causes.
fn describe(err: &MonitorError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    if source.is_some() {
        text.push_str("\n\nCaused by:");
    }
    while let Some(cause) = source {
        text.push_str("\n    ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Monitor")
            .field("service_name", &self.inner.service_name)
            .field("parsers", &self.inner.parsers.len())
            .field("cached", &state.cache.len())
            .field("observers", &state.observers)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Monitor`].
pub struct MonitorBuilder {
    service_name: String,
    parsers: Vec<Box<dyn LineParser>>,
    cache_capacity: usize,
    notifier: Option<Notifier>,
}

impl MonitorBuilder {
    fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            parsers: vec![Box::new(MetadataParser::new())],
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            notifier: None,
        }
    }

    /// Replace the parser chain. Defaults to a single [`MetadataParser`].
    #[must_use]
    pub fn parsers(mut self, parsers: Vec<Box<dyn LineParser>>) -> Self {
        self.parsers = parsers;
        self
    }

    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Where self-diagnostic mails go. Defaults to the console with no
    /// recipients.
    #[must_use]
    pub fn notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn build(self) -> Monitor {
        let notifier = self.notifier.unwrap_or_else(|| {
            Notifier::new(Arc::new(ConsoleMailer::new()), DEFAULT_FROM_ADDRESS, Vec::new())
        });

        Monitor {
            inner: Arc::new(Inner {
                service_name: self.service_name,
                parsers: self.parsers,
                notifier,
                state: Mutex::new(MonitorState {
                    cache: LineCache::new(self.cache_capacity),
                    observers: ObserverRegistry::new(),
                }),
            }),
        }
    }
}
