//! Raw line sources.
//!
//! Tails a growing log file and feeds every new line to a monitor.

mod error;
mod follow;
mod tailer;

pub use error::WatcherError;
pub use follow::follow;
pub use tailer::LineTailer;
