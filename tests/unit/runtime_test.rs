//! Tests for the tokio goal adapter

use parking_lot::Mutex;
use prometheus_planner::config::SchedulerConfig;
use prometheus_planner::core::{ErrorSink, Goal, PlannerError, Scheduler, Severity};
use prometheus_planner::runtime::AsyncGoal;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct RecordingSink(Mutex<Vec<(Severity, String)>>);

impl ErrorSink for RecordingSink {
    fn report(&self, severity: Severity, message: &str) {
        self.0.lock().push((severity, message.to_string()));
    }
}

#[test]
fn test_current_outside_runtime_fails() {
    let result = AsyncGoal::current(Arc::new(RecordingSink::default()), || async {
        Ok::<(), anyhow::Error>(())
    });
    assert!(matches!(result, Err(PlannerError::InvalidArgument(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduled_future_runs_on_runtime() {
    let sink = Arc::new(RecordingSink::default());
    let (tx, rx) = tokio::sync::oneshot::channel::<u32>();
    let tx = Arc::new(Mutex::new(Some(tx)));

    let goal = AsyncGoal::current(sink.clone(), move || {
        let tx = Arc::clone(&tx);
        async move {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(42);
            }
            Ok::<(), anyhow::Error>(())
        }
    })
    .unwrap();

    let scheduler = Scheduler::new(&SchedulerConfig::new(), sink.clone()).unwrap();
    scheduler
        .schedule_after(goal, Duration::from_millis(10))
        .unwrap();

    let value = tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value, 42);
    assert!(sink.0.lock().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_future_error_is_reported() {
    let sink = Arc::new(RecordingSink::default());
    let goal = AsyncGoal::current(sink.clone(), || async {
        Err::<(), _>(anyhow::anyhow!("upstream unavailable"))
    })
    .unwrap();

    goal.deliver().unwrap();
    for _ in 0..50 {
        if !sink.0.lock().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let reports = sink.0.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, Severity::Error);
    assert!(reports[0].1.contains("upstream unavailable"));
}
