//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log_sentinel::monitor::Monitor;
use log_sentinel::notify::{Mail, Mailer, Notifier, NotifyError};

pub const FROM: &str = "Log Monitoring <monitoring@example.com>";

pub fn recipients() -> Vec<String> {
    vec!["ops@example.com".to_string(), "oncall@example.com".to_string()]
}

/// Mailer that keeps every mail it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Mail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A mailer whose every send fails after being recorded.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, _from: &str, _to: &[String], mail: &Mail) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(mail.clone());
        if self.fail {
            return Err(NotifyError::Transport("relay refused".to_string()));
        }
        Ok(())
    }
}

pub fn notifier(mailer: &Arc<RecordingMailer>) -> Notifier {
    Notifier::new(mailer.clone(), FROM, recipients())
}

pub fn monitor(service: &str, mailer: &Arc<RecordingMailer>) -> Monitor {
    Monitor::builder(service).notifier(notifier(mailer)).build()
}
