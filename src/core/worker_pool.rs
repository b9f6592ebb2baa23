//! Worker pool: a bounded or unbounded FIFO of tasks drained by dedicated OS threads.
//!
//! A `WorkerPool` sits on top of a [`ThreadPool`](super::ThreadPool) whose
//! every slot runs the same worker loop: wait for the queue to become
//! non-empty, pop the head task under the queue lock, execute it outside the
//! lock, repeat.
//!
//! # Key Features
//!
//! - **FIFO**: tasks leave the queue in enqueue order
//! - **Backpressure**: a bounded pool blocks producers until a slot frees or their deadline passes
//! - **Fault isolation**: task errors and panics are reported, never fatal to a worker
//! - **Tri-phase lifecycle**: `activate` / `deactivate` / `wait`
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use prometheus_planner::config::WorkerPoolConfig;
//! use prometheus_planner::core::{ActiveObject, TracingSink, WorkerPool};
//!
//! let pool = WorkerPool::new(
//!     WorkerPoolConfig::new()
//!         .with_thread_count(2)
//!         .with_max_pending_tasks(16),
//!     Arc::new(TracingSink),
//! )?;
//!
//! pool.enqueue(Arc::new(|| -> anyhow::Result<()> { Ok(()) }), None)?;
//! pool.wait_for_queue_exhausting();
//! pool.deactivate();
//! pool.wait()?;
//! # Ok::<(), prometheus_planner::core::PlannerError>(())
//! ```

mod pool;
mod queue;

use std::sync::atomic::{AtomicU64, Ordering};

pub use pool::WorkerPool;

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker slots.
    pub worker_count: usize,

    /// Queue capacity; `0` means unbounded.
    pub max_pending_tasks: usize,

    /// Tasks waiting in the queue.
    pub queued_tasks: u64,

    /// Tasks currently executing.
    pub active_tasks: u64,

    /// Total tasks accepted by `enqueue`.
    pub submitted_tasks: u64,

    /// Total tasks that finished without error.
    pub completed_tasks: u64,

    /// Total tasks that returned an error or panicked.
    pub failed_tasks: u64,

    /// Total `enqueue` calls rejected with `Overflow` or `NotActive`.
    pub rejected_tasks: u64,

    /// Total tasks discarded by `clear` or at shutdown without running.
    pub discarded_tasks: u64,
}

/// Internal counters for pool statistics.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub submitted_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub rejected_tasks: AtomicU64,
    pub discarded_tasks: AtomicU64,
}

impl PoolCounters {
    /// Snapshot counters; queue-derived figures are filled in by the caller.
    pub fn snapshot(
        &self,
        worker_count: usize,
        max_pending_tasks: usize,
        queued_tasks: usize,
        active_tasks: usize,
    ) -> PoolStats {
        PoolStats {
            worker_count,
            max_pending_tasks,
            queued_tasks: queued_tasks as u64,
            active_tasks: active_tasks as u64,
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            rejected_tasks: self.rejected_tasks.load(Ordering::Relaxed),
            discarded_tasks: self.discarded_tasks.load(Ordering::Relaxed),
        }
    }
}
