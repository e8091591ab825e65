//! Standing observers that raise alerts.

mod error_burst;
mod inactivity;

pub use error_burst::{
    ErrorBurstListener, ALERT_PRIORITIES, DEFAULT_EXTRA_LINES_DELAY, DEFAULT_MAX_EXTRA_LINES,
};
pub use inactivity::{InactivityListener, DEFAULT_INACTIVITY_THRESHOLD, DEFAULT_PINGING_FREQUENCY};
