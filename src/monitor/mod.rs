//! Line dispatch and time-windowed aggregation.
//!
//! The [`Monitor`] parses each raw line, keeps it in a bounded
//! [`LineCache`] and hands it to every registered [`Observer`]. Observers
//! can ask the monitor to wait for further matching lines with
//! [`Monitor::await_lines`], which registers a short-lived observer that
//! removes itself once enough lines arrived or its deadline passed.

mod cache;
mod dispatcher;
mod error;
mod observer;
mod registry;
mod waiter;

pub use cache::{LineCache, DEFAULT_CACHE_CAPACITY};
pub use dispatcher::{match_all, Monitor, MonitorBuilder};
pub use error::{MonitorError, ObserverError, ObserverFailure};
pub use observer::Observer;
pub use registry::{ObserverId, ObserverRegistry};
