//! Observer capability.

use std::sync::Arc;

use async_trait::async_trait;

use crate::line::LogLine;

use super::{Monitor, ObserverError};

/// Receives every line a [`Monitor`] ingests.
///
/// `on_line` runs on the ingest path, so implementations should hand slow
/// work to [`Monitor::await_lines`] callbacks or background tasks. Observers
/// may add or remove observers, themselves included, through `monitor`.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handle one parsed line.
    ///
    /// # Errors
    ///
    /// A failure is reported by the monitor and does not stop delivery to
    /// other observers.
    async fn on_line(&self, line: &Arc<LogLine>, monitor: &Monitor) -> Result<(), ObserverError>;
}
