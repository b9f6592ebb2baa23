//! Builder assembling a worker pool and a scheduler from one configuration.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::PlannerConfig;
use crate::core::{
    ActiveObject, AppResult, ErrorSink, GoalTask, PlannerError, Scheduler, TaskGoal, TracingSink,
    WorkerPool,
};

/// Builds a [`Planner`] from [`PlannerConfig`].
pub struct PlannerBuilder {
    config: PlannerConfig,
    sink: Arc<dyn ErrorSink>,
}

impl PlannerBuilder {
    /// Create a builder reporting failures through [`TracingSink`].
    #[must_use]
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the sink shared by the pool and the scheduler.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Configuration the planner will be built from.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Construct the pool and the scheduler.
    ///
    /// Each service is activated during construction if its configuration asks for it.
    ///
    /// # Errors
    ///
    /// - `PlannerError::InvalidConfig` if the configuration is invalid
    /// - `PlannerError::Os` if threads could not be created
    pub fn build(self) -> Result<Planner, PlannerError> {
        self.config.validate().map_err(PlannerError::InvalidConfig)?;

        let pool = Arc::new(WorkerPool::new(self.config.pool, Arc::clone(&self.sink))?);
        let scheduler = Arc::new(Scheduler::new(&self.config.scheduler, self.sink)?);
        info!(
            pool = pool.name(),
            scheduler = scheduler.name(),
            "planner assembled"
        );
        Ok(Planner { pool, scheduler })
    }
}

/// A worker pool fed by a scheduler.
#[derive(Debug, Clone)]
pub struct Planner {
    pool: Arc<WorkerPool>,
    scheduler: Arc<Scheduler>,
}

impl Planner {
    /// The worker pool.
    #[must_use]
    pub const fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// The scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// One-shot adapter running `body` on this planner's pool when delivered.
    pub fn task_goal<F>(&self, body: F) -> Arc<TaskGoal>
    where
        F: Fn() -> AppResult<()> + Send + Sync + 'static,
    {
        TaskGoal::new(Arc::clone(&self.pool), body)
    }

    /// Re-armable adapter bound to this planner's scheduler and pool.
    pub fn goal_task<F>(&self, body: F) -> Arc<GoalTask>
    where
        F: Fn(&GoalTask) -> AppResult<()> + Send + Sync + 'static,
    {
        GoalTask::new(Arc::clone(&self.scheduler), Arc::clone(&self.pool), body)
    }
}

impl ActiveObject for Planner {
    /// Activates the pool first so the scheduler never delivers into an inactive pool.
    fn activate(&self) -> Result<(), PlannerError> {
        if !self.pool.is_active() {
            self.pool.activate()?;
        }
        if !self.scheduler.is_active() {
            if let Err(e) = self.scheduler.activate() {
                self.pool.deactivate();
                if let Err(join) = self.pool.wait() {
                    warn!(
                        pool = self.pool.name(),
                        error = %join,
                        "pool rollback left failed workers"
                    );
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn deactivate(&self) {
        self.scheduler.deactivate();
        self.pool.deactivate();
    }

    fn wait(&self) -> Result<(), PlannerError> {
        let scheduler = self.scheduler.wait();
        let pool = self.pool.wait();
        scheduler.and(pool)
    }

    fn is_active(&self) -> bool {
        self.pool.is_active() && self.scheduler.is_active()
    }
}
