//! Monitor error types.

use std::any::Any;

use crate::line::ParseError;
use crate::notify::NotifyError;

use super::ObserverId;

/// Errors returned by an observer or a windowed wait completion.
#[derive(thiserror::Error, Debug)]
pub enum ObserverError {
    /// Sending a notification failed.
    #[error("Notification failed: {0}")]
    Notify(#[from] NotifyError),

    /// The observer failed for another reason.
    #[error("{0}")]
    Failed(String),

    /// The observer panicked.
    #[error("Observer panicked: {0}")]
    Panicked(String),
}

/// One observer's failure during a fan-out.
#[derive(thiserror::Error, Debug)]
#[error("Observer {observer} ({id}) failed: {source}")]
pub struct ObserverFailure {
    /// Observer name.
    pub observer: String,
    /// Registration id.
    pub id: ObserverId,
    #[source]
    pub source: ObserverError,
}

/// Errors that can occur while ingesting a line.
#[derive(thiserror::Error, Debug)]
pub enum MonitorError {
    /// A parser stage failed; the line was neither cached nor delivered.
    #[error(transparent)]
    ParseStage(#[from] ParseError),

    /// One or more observers failed. Every other observer still got the line.
    #[error("{} observer(s) failed: {}", .0.len(), describe(.0))]
    Observers(Vec<ObserverFailure>),

    /// A windowed wait completed on its deadline and its callback failed.
    #[error("Windowed wait completion failed: {0}")]
    Completion(#[source] ObserverError),

    /// Ingest panicked.
    #[error("Monitor panicked: {0}")]
    Panicked(String),
}

fn describe(failures: &[ObserverFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
