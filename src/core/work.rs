//! Units of work accepted by pools and the scheduler.
//!
//! Three contracts, one per thread role:
//!
//! - [`Job`] is bound to a single pool thread for its entire lifetime.
//! - [`Task`] is a one-shot unit executed by a `WorkerPool` worker.
//! - [`Goal`] is a time-triggered event delivered by the `Scheduler` thread.
//!
//! Closures implement `Task` and `Goal` directly:
//!
//! ```rust
//! use std::sync::Arc;
//! use prometheus_planner::core::{Goal, Task};
//!
//! let task: Arc<dyn Task> = Arc::new(|| -> anyhow::Result<()> { Ok(()) });
//! assert!(task.execute().is_ok());
//!
//! let goal: Arc<dyn Goal> = Arc::new(|| -> anyhow::Result<()> { Ok(()) });
//! assert!(goal.deliver().is_ok());
//! ```

use super::AppResult;

/// Work permanently bound to one pool thread.
///
/// `work` runs exactly once per started thread and should not return until the
/// job is finished. Panics are caught and reported by the owning pool.
pub trait Job: Send + Sync + 'static {
    /// Body of the thread.
    fn work(&self);
}

/// One-shot unit of work executed on a `WorkerPool` worker.
pub trait Task: Send + Sync + 'static {
    /// Run the task. Errors are reported through the pool's sink and never
    /// terminate the worker.
    ///
    /// # Errors
    ///
    /// Any error the task body produces.
    fn execute(&self) -> AppResult<()>;
}

/// Scheduled event delivered on the `Scheduler` thread once its time is due.
///
/// Delivery runs synchronously on the scheduler thread, so implementations
/// should hand real work off (see `TaskGoal`) rather than perform it inline.
pub trait Goal: Send + Sync + 'static {
    /// Fire the event.
    ///
    /// # Errors
    ///
    /// Any error the goal produces; it is reported and the scheduler continues.
    fn deliver(&self) -> AppResult<()>;
}

impl<F> Task for F
where
    F: Fn() -> AppResult<()> + Send + Sync + 'static,
{
    fn execute(&self) -> AppResult<()> {
        self()
    }
}

impl<F> Goal for F
where
    F: Fn() -> AppResult<()> + Send + Sync + 'static,
{
    fn deliver(&self) -> AppResult<()> {
        self()
    }
}

/// Adapter turning a closure into a [`Job`].
pub struct FnJob<F>(pub F);

impl<F> Job for FnJob<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn work(&self) {
        (self.0)();
    }
}

/// Opaque address of a shared object, used to compare trait objects by identity.
pub(crate) fn identity<T: ?Sized>(value: &std::sync::Arc<T>) -> *const () {
    std::sync::Arc::as_ptr(value).cast::<()>()
}
