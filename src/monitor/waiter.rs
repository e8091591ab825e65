//! Self-expiring observer that collects matching lines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::line::LogLine;

use super::{Monitor, MonitorError, Observer, ObserverError, ObserverId};

pub(crate) type LineFilter = Box<dyn Fn(&LogLine) -> bool + Send + Sync>;

pub(crate) type Completion =
    Box<dyn FnOnce(Vec<Arc<LogLine>>) -> BoxFuture<'static, Result<(), ObserverError>> + Send>;

struct Pending {
    lines: Vec<Arc<LogLine>>,
    on_complete: Option<Completion>,
}

/// Collects lines passing `filter` until `wanted` of them arrived or the
/// timer fires, then detaches from the monitor and runs `on_complete` once.
///
/// The count path and the timer path race for `completed`; only the winner
/// runs the completion.
pub(crate) struct WindowedWaiter {
    id: ObserverId,
    wanted: usize,
    filter: LineFilter,
    completed: AtomicBool,
    pending: Mutex<Pending>,
    timer: CancellationToken,
}

impl WindowedWaiter {
    pub(crate) fn new(
        id: ObserverId,
        wanted: usize,
        filter: LineFilter,
        on_complete: Completion,
    ) -> Self {
        Self {
            id,
            wanted,
            filter,
            completed: AtomicBool::new(false),
            pending: Mutex::new(Pending {
                lines: Vec::new(),
                on_complete: Some(on_complete),
            }),
            timer: CancellationToken::new(),
        }
    }

    /// Start the deadline timer.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn arm(self: &Arc<Self>, monitor: Monitor, timeout: Duration) {
        let waiter = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = waiter.timer.cancelled() => return,
                () = tokio::time::sleep(timeout) => {}
            }

            let Some((lines, on_complete)) = waiter.finish(&mut waiter.lock()) else {
                return;
            };
            monitor.remove_observer(waiter.id);
            tracing::debug!(waiter = %waiter.id, lines = lines.len(), "Windowed wait timed out");

            if let Err(err) = on_complete(lines).await {
                monitor.recover(&MonitorError::Completion(err)).await;
            }
        });
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim completion. Returns `None` if the other path already won.
    fn finish(&self, pending: &mut Pending) -> Option<(Vec<Arc<LogLine>>, Completion)> {
        if self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.timer.cancel();
        let on_complete = pending.on_complete.take()?;
        Some((std::mem::take(&mut pending.lines), on_complete))
    }
}

#[async_trait]
impl Observer for WindowedWaiter {
    fn name(&self) -> &str {
        "windowed-waiter"
    }

    async fn on_line(&self, line: &Arc<LogLine>, monitor: &Monitor) -> Result<(), ObserverError> {
        if self.completed.load(Ordering::Acquire) || !(self.filter)(line.as_ref()) {
            return Ok(());
        }

        let finished = {
            let mut pending = self.lock();
            pending.lines.push(Arc::clone(line));
            if pending.lines.len() == self.wanted {
                self.finish(&mut pending)
            } else {
                None
            }
        };

        let Some((lines, on_complete)) = finished else {
            return Ok(());
        };
        monitor.remove_observer(self.id);
        tracing::debug!(waiter = %self.id, lines = lines.len(), "Windowed wait filled");
        on_complete(lines).await
    }
}
