//! Tests for the planner builder

use parking_lot::Mutex;
use prometheus_planner::builders::PlannerBuilder;
use prometheus_planner::config::{PlannerConfig, SchedulerConfig, WorkerPoolConfig};
use prometheus_planner::core::{ActiveObject, ErrorSink, Severity};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct RecordingSink(Mutex<Vec<String>>);

impl ErrorSink for RecordingSink {
    fn report(&self, _severity: Severity, message: &str) {
        self.0.lock().push(message.to_string());
    }
}

fn config(name: &str) -> PlannerConfig {
    PlannerConfig {
        pool: WorkerPoolConfig::new()
            .with_name(format!("{name}-pool"))
            .with_thread_count(2),
        scheduler: SchedulerConfig::new().with_name(format!("{name}-sched")),
    }
}

#[test]
fn test_build_names_services() {
    let planner = PlannerBuilder::new(config("named")).build().unwrap();
    assert_eq!(planner.pool().name(), "named-pool");
    assert_eq!(planner.scheduler().name(), "named-sched");
    assert_eq!(planner.pool().thread_count(), 2);
    assert!(planner.is_active());
}

#[test]
fn test_builder_exposes_config() {
    let builder = PlannerBuilder::new(config("cfg"));
    assert_eq!(builder.config().pool.thread_count, 2);
}

#[test]
fn test_task_goal_runs_once() {
    let planner = PlannerBuilder::new(config("oneshot")).build().unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let goal = planner.task_goal(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    planner
        .scheduler()
        .schedule(goal, Instant::now() + Duration::from_millis(10))
        .unwrap();

    std::thread::sleep(Duration::from_millis(150));
    planner.deactivate();
    planner.wait().unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_custom_sink_receives_failures() {
    let sink = Arc::new(RecordingSink::default());
    let planner = PlannerBuilder::new(config("sink"))
        .with_sink(sink.clone())
        .build()
        .unwrap();

    let goal = planner.goal_task(|_| anyhow::bail!("nightly job failed"));
    goal.schedule_after(Duration::from_millis(10)).unwrap();

    std::thread::sleep(Duration::from_millis(150));
    planner.deactivate();
    planner.wait().unwrap();

    let reports = sink.0.lock();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("nightly job failed"));
}

#[test]
fn test_reactivate_planner() {
    let planner = PlannerBuilder::new(config("again")).build().unwrap();
    planner.deactivate();
    planner.wait().unwrap();
    assert!(!planner.is_active());

    planner.activate().unwrap();
    assert!(planner.is_active());
}
