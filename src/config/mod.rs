//! Configuration models for worker pools and the scheduler.

pub mod pool;

pub use pool::{PlannerConfig, SchedulerConfig, WorkerPoolConfig};
