//! Adapters that hand scheduled goals off to a worker pool.
//!
//! Delivery runs on the scheduler thread, so a goal that does real work there
//! delays every other entry. [`TaskGoal`] and [`GoalTask`] are both a `Goal`
//! and a `Task`: delivering them only enqueues them into a [`WorkerPool`],
//! and the body runs later on a worker thread.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use prometheus_planner::config::{SchedulerConfig, WorkerPoolConfig};
//! use prometheus_planner::core::{GoalTask, Scheduler, TracingSink, WorkerPool};
//!
//! let sink = Arc::new(TracingSink);
//! let pool = Arc::new(WorkerPool::new(WorkerPoolConfig::new(), sink.clone())?);
//! let scheduler = Arc::new(Scheduler::new(&SchedulerConfig::new(), sink)?);
//!
//! // Runs every second on a pool worker until unscheduled.
//! let tick = GoalTask::new(scheduler, pool, |me| {
//!     me.schedule_after(Duration::from_secs(1))?;
//!     Ok(())
//! });
//! tick.schedule_after(Duration::from_secs(1))?;
//! # Ok::<(), prometheus_planner::core::PlannerError>(())
//! ```

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crate::core::{AppResult, Goal, PlannerError, Scheduler, Task, WorkerPool};
use crate::util::clock::deadline_after;

type TaskBody = Box<dyn Fn() -> AppResult<()> + Send + Sync>;
type GoalTaskBody = Box<dyn Fn(&GoalTask) -> AppResult<()> + Send + Sync>;

fn released() -> PlannerError {
    PlannerError::InvalidArgument("adapter is being released".into())
}

fn enqueue_self(
    pool: &WorkerPool,
    this: Arc<dyn Task>,
    timeout: Option<Duration>,
) -> Result<(), PlannerError> {
    pool.enqueue(this, timeout.map(deadline_after))
}

/// One-shot goal whose delivery enqueues its body into a worker pool.
pub struct TaskGoal {
    this: Weak<TaskGoal>,
    pool: Arc<WorkerPool>,
    enqueue_timeout: Option<Duration>,
    body: TaskBody,
}

impl TaskGoal {
    /// Create an adapter running `body` on `pool` once delivered.
    ///
    /// Delivery waits as long as needed for room in a bounded pool, and it
    /// waits on the scheduler thread: every other entry is held up until the
    /// pool frees a slot. Use [`with_enqueue_timeout`](Self::with_enqueue_timeout)
    /// to bound that wait.
    pub fn new<F>(pool: Arc<WorkerPool>, body: F) -> Arc<Self>
    where
        F: Fn() -> AppResult<()> + Send + Sync + 'static,
    {
        Self::build(pool, None, Box::new(body))
    }

    /// Like [`new`](Self::new), but delivery fails with `Overflow` if the pool
    /// stays full for longer than `timeout`.
    pub fn with_enqueue_timeout<F>(pool: Arc<WorkerPool>, timeout: Duration, body: F) -> Arc<Self>
    where
        F: Fn() -> AppResult<()> + Send + Sync + 'static,
    {
        Self::build(pool, Some(timeout), Box::new(body))
    }

    fn build(pool: Arc<WorkerPool>, enqueue_timeout: Option<Duration>, body: TaskBody) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            pool,
            enqueue_timeout,
            body,
        })
    }
}

impl Goal for TaskGoal {
    fn deliver(&self) -> AppResult<()> {
        let this = self.this.upgrade().ok_or_else(released)?;
        enqueue_self(&self.pool, this, self.enqueue_timeout)?;
        Ok(())
    }
}

impl Task for TaskGoal {
    fn execute(&self) -> AppResult<()> {
        (self.body)()
    }
}

/// Goal that runs its body on a worker pool and can re-arm itself.
///
/// The body receives the adapter so it can call [`schedule`](Self::schedule)
/// again, producing periodic work without the scheduler thread ever running it.
pub struct GoalTask {
    this: Weak<GoalTask>,
    scheduler: Arc<Scheduler>,
    pool: Arc<WorkerPool>,
    enqueue_timeout: Option<Duration>,
    body: GoalTaskBody,
}

impl GoalTask {
    /// Create an adapter bound to `scheduler` and `pool`.
    ///
    /// Delivery enqueues without a deadline. On a full bounded pool it blocks
    /// the scheduler thread until a slot frees; use
    /// [`with_enqueue_timeout`](Self::with_enqueue_timeout) to bound the wait.
    pub fn new<F>(scheduler: Arc<Scheduler>, pool: Arc<WorkerPool>, body: F) -> Arc<Self>
    where
        F: Fn(&Self) -> AppResult<()> + Send + Sync + 'static,
    {
        Self::build(scheduler, pool, None, Box::new(body))
    }

    /// Like [`new`](Self::new), with a bound on how long delivery waits for room in the pool.
    pub fn with_enqueue_timeout<F>(
        scheduler: Arc<Scheduler>,
        pool: Arc<WorkerPool>,
        timeout: Duration,
        body: F,
    ) -> Arc<Self>
    where
        F: Fn(&Self) -> AppResult<()> + Send + Sync + 'static,
    {
        Self::build(scheduler, pool, Some(timeout), Box::new(body))
    }

    fn build(
        scheduler: Arc<Scheduler>,
        pool: Arc<WorkerPool>,
        enqueue_timeout: Option<Duration>,
        body: GoalTaskBody,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            scheduler,
            pool,
            enqueue_timeout,
            body,
        })
    }

    /// Insert this adapter into its scheduler, due at `at`.
    ///
    /// # Errors
    ///
    /// - `PlannerError::NotActive` if the scheduler is not running
    /// - `PlannerError::InvalidArgument` if the adapter is being released
    pub fn schedule(&self, at: Instant) -> Result<(), PlannerError> {
        let this = self.this.upgrade().ok_or_else(released)?;
        self.scheduler.schedule(this, at)
    }

    /// Insert this adapter into its scheduler, due `delay` from now.
    ///
    /// # Errors
    ///
    /// Same as [`schedule`](Self::schedule).
    pub fn schedule_after(&self, delay: Duration) -> Result<(), PlannerError> {
        self.schedule(deadline_after(delay))
    }

    /// Remove every pending entry of this adapter from its scheduler.
    pub fn unschedule(&self) -> usize {
        self.this
            .upgrade()
            .map_or(0, |this| self.scheduler.unschedule(&this))
    }

    /// Scheduler this adapter re-arms into.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Pool this adapter runs on.
    #[must_use]
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }
}

impl Goal for GoalTask {
    fn deliver(&self) -> AppResult<()> {
        let this = self.this.upgrade().ok_or_else(released)?;
        enqueue_self(&self.pool, this, self.enqueue_timeout)?;
        Ok(())
    }
}

impl Task for GoalTask {
    fn execute(&self) -> AppResult<()> {
        (self.body)(self)
    }
}
