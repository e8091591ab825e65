//! Feed a tailed file into a monitor.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::monitor::Monitor;

use super::{LineTailer, WatcherError};

/// Poll `tailer` every `poll_interval` and ingest each new line until
/// `cancel` fires.
///
/// Lines go through [`Monitor::ingest_with_recovery`], so monitoring
/// failures never end the loop. A file that disappears (e.g. during log
/// rotation) is waited for and read from the start once it is back.
///
/// # Errors
///
/// Returns an error if the file becomes unreadable for any reason other
/// than being missing.
pub async fn follow(
    tailer: &mut LineTailer,
    monitor: &Monitor,
    poll_interval: Duration,
    cancel: CancellationToken,
) -> Result<(), WatcherError> {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut missing = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        let lines = match tailer.read_new_lines().await {
            Ok(lines) => lines,
            Err(WatcherError::FileDeleted(path)) => {
                if !missing {
                    tracing::warn!(
                        path = %path.display(),
                        "Log file missing, waiting for it to return"
                    );
                    missing = true;
                }
                tailer.reset();
                continue;
            }
            Err(err) => return Err(err),
        };

        if missing {
            tracing::info!(path = %tailer.path().display(), "Log file is back");
            missing = false;
        }

        for line in lines {
            monitor.ingest_with_recovery(&line).await;
        }
    }
}
