//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use prometheus_planner::config::{SchedulerConfig, WorkerPoolConfig};
use prometheus_planner::core::{ErrorSink, Scheduler, Severity, WorkerPool};

/// Sink remembering every report.
#[derive(Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<(Severity, String)>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<(Severity, String)> {
        self.reports.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.reports.lock().len()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, severity: Severity, message: &str) {
        self.reports.lock().push((severity, message.to_string()));
    }
}

pub fn pool(name: &str, threads: usize, capacity: usize, sink: Arc<CollectingSink>) -> WorkerPool {
    WorkerPool::new(
        WorkerPoolConfig::new()
            .with_name(name)
            .with_thread_count(threads)
            .with_max_pending_tasks(capacity),
        sink,
    )
    .expect("worker pool")
}

pub fn scheduler(name: &str, sink: Arc<CollectingSink>) -> Scheduler {
    Scheduler::new(&SchedulerConfig::new().with_name(name), sink).expect("scheduler")
}
