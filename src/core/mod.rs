//! Thread pools, the worker queue, the scheduler and the adapters between them.

pub mod bridge;
pub mod error;
pub mod lifecycle;
pub mod report;
pub mod scheduler;
pub mod thread_pool;
pub mod work;
pub mod worker_pool;

pub use bridge::{GoalTask, TaskGoal};
pub use error::{AppResult, PlannerError};
pub use lifecycle::ActiveObject;
pub use report::{ErrorSink, Severity, TracingSink};
pub use scheduler::{Scheduler, SchedulerStats};
pub use thread_pool::{OsThreadSpawner, ThreadBody, ThreadPool, ThreadSpawner};
pub use work::{FnJob, Goal, Job, Task};
pub use worker_pool::{PoolStats, WorkerPool};
