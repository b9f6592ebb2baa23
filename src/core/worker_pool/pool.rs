//! `WorkerPool` built from a `ThreadPool` of queue-draining workers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::queue::{TaskQueue, Worker};
use super::PoolStats;
use crate::config::WorkerPoolConfig;
use crate::core::report::ErrorSink;
use crate::core::{ActiveObject, Job, PlannerError, Task, ThreadPool};
use crate::util::clock::deadline_after;

/// Pool of worker threads sharing one FIFO task queue.
///
/// # Design
///
/// - **No polling**: idle workers park on a condition variable
/// - **Lock-free execution**: a task runs after its worker released the queue lock,
///   so a slow task never blocks `enqueue`
/// - **Backpressure**: when `max_pending_tasks > 0`, `enqueue` waits for room
///   until the caller's deadline and then fails with `Overflow`
pub struct WorkerPool {
    /// Pool configuration.
    config: WorkerPoolConfig,

    /// Resolved instance name used for thread names and logs.
    name: String,

    /// Queue shared with the workers.
    queue: Arc<TaskQueue>,

    /// Worker threads.
    threads: ThreadPool,

    /// Serializes `activate` / `deactivate` / `wait`.
    lifecycle: Mutex<()>,
}

impl WorkerPool {
    /// Create a pool and, if `config.start_threads` is set, activate it.
    ///
    /// `sink` receives errors and panics raised by tasks.
    ///
    /// # Errors
    ///
    /// - `PlannerError::InvalidConfig` if the configuration is invalid
    /// - `PlannerError::Os` if worker threads could not be created
    pub fn new(config: WorkerPoolConfig, sink: Arc<dyn ErrorSink>) -> Result<Self, PlannerError> {
        config.validate().map_err(PlannerError::InvalidConfig)?;

        let name = config.resolved_name();
        let queue = Arc::new(TaskQueue::new(
            name.clone(),
            config.max_pending_tasks,
            Arc::clone(&sink),
        ));
        let threads = ThreadPool::from_factory(config.thread_count, |id| {
            Arc::new(Worker {
                id,
                queue: Arc::clone(&queue),
            }) as Arc<dyn Job>
        })?
        .with_name(name.clone())
        .with_stack_size(config.stack_size)
        .with_sink(sink);

        let pool = Self {
            config,
            name,
            queue,
            threads,
            lifecycle: Mutex::new(()),
        };

        info!(
            pool = %pool.name,
            thread_count = pool.config.thread_count,
            max_pending_tasks = pool.config.max_pending_tasks,
            "WorkerPool initialized"
        );

        if pool.config.start_threads {
            pool.activate()?;
        }
        Ok(pool)
    }

    /// Instance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of worker threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.thread_count()
    }

    /// Queue capacity; `0` means unbounded.
    #[must_use]
    pub const fn max_pending_tasks(&self) -> usize {
        self.config.max_pending_tasks
    }

    /// Add `task` to the tail of the queue.
    ///
    /// On a bounded pool whose queue is full this blocks until a worker frees a
    /// slot or `deadline` passes. `None` waits indefinitely.
    ///
    /// # Errors
    ///
    /// - `PlannerError::NotActive` if the pool is not activated
    /// - `PlannerError::Overflow` if the queue was still full at `deadline`
    pub fn enqueue(
        &self,
        task: Arc<dyn Task>,
        deadline: Option<Instant>,
    ) -> Result<(), PlannerError> {
        self.queue.push(task, deadline)
    }

    /// [`enqueue`](Self::enqueue) with a deadline `timeout` from now.
    ///
    /// # Errors
    ///
    /// Same as [`enqueue`](Self::enqueue).
    pub fn enqueue_for(&self, task: Arc<dyn Task>, timeout: Duration) -> Result<(), PlannerError> {
        self.queue.push(task, Some(deadline_after(timeout)))
    }

    /// Number of tasks waiting in the queue.
    ///
    /// The figure may be stale by the time the caller reads it.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.queue.len()
    }

    /// Block until the queue is observably empty.
    ///
    /// Tasks may still be executing, and new tasks may arrive right after return.
    pub fn wait_for_queue_exhausting(&self) {
        self.queue.wait_exhausted();
    }

    /// Discard all queued tasks without executing them.
    ///
    /// Tasks already taken by a worker are not affected. Returns the number discarded.
    pub fn clear(&self) -> usize {
        let discarded = self.queue.clear();
        if discarded > 0 {
            debug!(pool = %self.name, discarded, "task queue cleared");
        }
        discarded
    }

    /// Snapshot of pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.queue.counters.snapshot(
            self.threads.thread_count(),
            self.config.max_pending_tasks,
            self.queue.len(),
            self.queue.executing(),
        )
    }
}

impl ActiveObject for WorkerPool {
    fn activate(&self) -> Result<(), PlannerError> {
        let _lifecycle = self.lifecycle.lock();
        if self.threads.running_count() > 0 {
            return Err(PlannerError::AlreadyStarted);
        }
        self.queue.open();
        if let Err(e) = self.threads.start(None) {
            self.queue.close();
            return Err(e);
        }
        info!(pool = %self.name, "WorkerPool activated");
        Ok(())
    }

    fn deactivate(&self) {
        let _lifecycle = self.lifecycle.lock();
        if self.queue.is_accepting() {
            self.queue.close();
            info!(pool = %self.name, pending = self.queue.len(), "WorkerPool deactivated");
        }
    }

    fn wait(&self) -> Result<(), PlannerError> {
        let _lifecycle = self.lifecycle.lock();
        let joined = self.threads.wait_for_completion();
        if !self.queue.is_accepting() {
            let discarded = self.queue.clear();
            if discarded > 0 {
                warn!(pool = %self.name, discarded, "tasks dropped at shutdown");
            }
        }
        joined
    }

    fn is_active(&self) -> bool {
        self.queue.is_accepting()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.deactivate();
        if let Err(e) = self.wait() {
            warn!(pool = %self.name, error = %e, "WorkerPool dropped with failed workers");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}
