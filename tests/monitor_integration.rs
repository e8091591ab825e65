//! Integration tests for the line dispatcher.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{monitor, RecordingMailer};
use log_sentinel::line::LogLine;
use log_sentinel::monitor::{match_all, Monitor, MonitorError, Observer, ObserverError};

/// Records the raw text of every line it sees, tagged with its own label.
struct Recorder {
    label: &'static str,
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Observer for Recorder {
    async fn on_line(&self, line: &Arc<LogLine>, _monitor: &Monitor) -> Result<(), ObserverError> {
        self.seen
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.label, line.raw()));
        Ok(())
    }
}

struct Whoops;

#[async_trait]
impl Observer for Whoops {
    async fn on_line(&self, _line: &Arc<LogLine>, _monitor: &Monitor) -> Result<(), ObserverError> {
        Err(ObserverError::Failed("whoops".to_string()))
    }
}

struct Panicker;

#[async_trait]
impl Observer for Panicker {
    async fn on_line(&self, _line: &Arc<LogLine>, _monitor: &Monitor) -> Result<(), ObserverError> {
        panic!("observer blew up");
    }
}

fn collector() -> (
    Arc<Mutex<Option<Vec<String>>>>,
    impl FnOnce(Vec<Arc<LogLine>>) -> std::future::Ready<Result<(), ObserverError>>,
) {
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    let on_complete = move |lines: Vec<Arc<LogLine>>| {
        let raw = lines.iter().map(|line| line.raw().to_string()).collect();
        *sink.lock().unwrap() = Some(raw);
        std::future::ready(Ok(()))
    };
    (slot, on_complete)
}

#[tokio::test]
async fn cache_keeps_most_recent_lines() {
    let mailer = RecordingMailer::new();
    let monitor = Monitor::builder("svc")
        .notifier(common::notifier(&mailer))
        .cache_capacity(3)
        .build();

    for i in 0..5 {
        monitor.ingest(&format!("line {i}")).await.unwrap();
    }

    let cached: Vec<String> = monitor
        .cached_lines()
        .iter()
        .map(|line| line.raw().to_string())
        .collect();
    assert_eq!(cached, ["line 2", "line 3", "line 4"]);
}

#[tokio::test]
async fn every_observer_sees_each_line_once_in_order() {
    let mailer = RecordingMailer::new();
    let monitor = monitor("svc", &mailer);
    let seen = Arc::new(Mutex::new(Vec::new()));

    for label in ["a", "b", "c"] {
        monitor.add_observer(Arc::new(Recorder {
            label,
            seen: Arc::clone(&seen),
        }));
    }

    monitor.ingest("first").await.unwrap();
    monitor.ingest("second").await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        ["a:first", "b:first", "c:first", "a:second", "b:second", "c:second"]
    );
}

#[tokio::test]
async fn removing_an_observer_twice_is_harmless() {
    let mailer = RecordingMailer::new();
    let monitor = monitor("svc", &mailer);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let id = monitor.add_observer(Arc::new(Recorder {
        label: "a",
        seen: Arc::clone(&seen),
    }));

    assert!(monitor.remove_observer(id));
    assert!(!monitor.remove_observer(id));

    monitor.ingest("ignored").await.unwrap();
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(monitor.observer_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn await_lines_completes_when_count_reached() {
    let mailer = RecordingMailer::new();
    let monitor = monitor("svc", &mailer);
    let (slot, on_complete) = collector();

    let id = monitor.await_lines(1, Duration::from_millis(250), match_all, on_complete);
    monitor.ingest("herp").await.unwrap();

    assert_eq!(slot.lock().unwrap().as_deref(), Some(&["herp".to_string()][..]));
    assert!(!monitor.has_observer(id));

    // The deadline passing afterwards must not run the callback again.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(slot.lock().unwrap().as_ref().map(Vec::len), Some(1));
}

#[tokio::test(start_paused = true)]
async fn await_lines_times_out_with_partial_lines() {
    let mailer = RecordingMailer::new();
    let monitor = monitor("svc", &mailer);
    let (slot, on_complete) = collector();

    let id = monitor.await_lines(2, Duration::from_millis(250), match_all, on_complete);
    monitor.ingest("herp").await.unwrap();
    assert!(slot.lock().unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(slot.lock().unwrap().as_deref(), Some(&["herp".to_string()][..]));
    assert!(!monitor.has_observer(id));

    monitor.ingest("derp").await.unwrap();
    assert_eq!(slot.lock().unwrap().as_ref().map(Vec::len), Some(1));
}

#[tokio::test(start_paused = true)]
async fn await_lines_only_counts_matching_lines() {
    let mailer = RecordingMailer::new();
    let monitor = monitor("svc", &mailer);
    let (slot, on_complete) = collector();

    monitor.await_lines(
        1,
        Duration::from_millis(250),
        |line: &LogLine| line.contains("herp"),
        on_complete,
    );
    monitor.ingest("derp").await.unwrap();
    assert!(slot.lock().unwrap().is_none());

    monitor.ingest("herp derp").await.unwrap();
    assert_eq!(
        slot.lock().unwrap().as_deref(),
        Some(&["herp derp".to_string()][..])
    );
}

#[tokio::test]
async fn strict_ingest_reports_failures_after_full_delivery() {
    let mailer = RecordingMailer::new();
    let monitor = monitor("svc", &mailer);
    let seen = Arc::new(Mutex::new(Vec::new()));

    monitor.add_observer(Arc::new(Whoops));
    monitor.add_observer(Arc::new(Recorder {
        label: "after",
        seen: Arc::clone(&seen),
    }));

    let err = monitor.ingest("line").await.unwrap_err();
    assert!(matches!(err, MonitorError::Observers(ref failures) if failures.len() == 1));
    assert_eq!(*seen.lock().unwrap(), ["after:line"]);
    assert_eq!(mailer.count(), 0);
}

#[tokio::test]
async fn recovery_mails_one_self_diagnostic() {
    let mailer = RecordingMailer::new();
    let monitor = monitor("billing", &mailer);
    monitor.add_observer(Arc::new(Whoops));

    monitor.ingest_with_recovery("line").await;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("billing"));
    assert!(sent[0].subject.contains("Error in log monitoring system"));
    assert!(sent[0].body.contains("whoops"));
    assert_eq!(sent[0].to, "ops@example.com,oncall@example.com");
}

#[tokio::test]
async fn recovery_survives_failing_self_report() {
    let mailer = RecordingMailer::failing();
    let monitor = monitor("svc", &mailer);
    monitor.add_observer(Arc::new(Whoops));

    monitor.ingest_with_recovery("line").await;
    monitor.ingest_with_recovery("another").await;

    assert_eq!(mailer.count(), 2);
    assert_eq!(monitor.cached_lines().len(), 2);
}

#[tokio::test]
async fn recovery_survives_panicking_observer() {
    let mailer = RecordingMailer::new();
    let monitor = monitor("svc", &mailer);
    let seen = Arc::new(Mutex::new(Vec::new()));

    monitor.add_observer(Arc::new(Panicker));
    monitor.add_observer(Arc::new(Recorder {
        label: "healthy",
        seen: Arc::clone(&seen),
    }));

    monitor.ingest_with_recovery("one").await;
    monitor.ingest_with_recovery("two").await;

    assert_eq!(*seen.lock().unwrap(), ["healthy:one", "healthy:two"]);
    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].body.contains("observer blew up"));
}

#[tokio::test(start_paused = true)]
async fn failing_completion_on_count_path_fails_strict_ingest() {
    let mailer = RecordingMailer::new();
    let monitor = monitor("svc", &mailer);

    let id = monitor.await_lines(1, Duration::from_millis(250), match_all, |_lines| {
        std::future::ready(Err(ObserverError::Failed("callback broke".to_string())))
    });

    let failures = match monitor.ingest("herp").await {
        Err(MonitorError::Observers(failures)) => failures,
        other => panic!("expected observer failures, got {other:?}"),
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].observer, "windowed-waiter");
    assert!(failures[0].to_string().contains("callback broke"));
    assert!(!monitor.has_observer(id));

    // The deadline passing later must not run the callback or mail anything.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(mailer.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failing_completion_on_timer_path_is_reported() {
    let mailer = RecordingMailer::new();
    let monitor = monitor("svc", &mailer);

    monitor.await_lines(2, Duration::from_millis(250), match_all, |_lines| {
        std::future::ready(Err(ObserverError::Failed("callback broke".to_string())))
    });
    monitor.ingest("herp").await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "svc: Error in log monitoring system");
    assert!(sent[0].body.contains("callback broke"));
    assert_eq!(monitor.observer_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deadline_and_count_race_completes_each_wait_once() {
    const WAITS: usize = 300;

    let mailer = RecordingMailer::new();
    let monitor = monitor("svc", &mailer);
    let calls: Vec<Arc<AtomicUsize>> = (0..WAITS).map(|_| Arc::new(AtomicUsize::new(0))).collect();

    for (i, counter) in calls.iter().enumerate() {
        let counter = Arc::clone(counter);
        let timeout = Duration::from_micros(50 * (i as u64 % 40));
        monitor.await_lines(1, timeout, match_all, move |_lines| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        });
        if i % 3 == 0 {
            tokio::task::yield_now().await;
        }
        monitor.ingest(&format!("line {i}")).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(100)).await;

    for (i, counter) in calls.iter().enumerate() {
        assert_eq!(counter.load(Ordering::SeqCst), 1, "wait {i} completed wrong number of times");
    }
    assert_eq!(monitor.observer_count(), 0);
    assert_eq!(mailer.count(), 0);
}
