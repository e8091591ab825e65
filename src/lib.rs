//! Log Sentinel - tail a log file and mail alerts about what it says.
//!
//! Lines flow through a [`monitor::Monitor`], which parses them, keeps the
//! most recent ones and hands each to its observers. The standing observers
//! in [`listeners`] report error bursts and prolonged silence.

pub mod config;
pub mod line;
pub mod listeners;
pub mod monitor;
pub mod notify;
pub mod watcher;
