//! Error types for pool, queue and planner operations.

use thiserror::Error;

/// Errors produced by thread pools, worker pools and the scheduler.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Malformed input such as a released task handle or an impossible thread count.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Bounded queue stayed full past the caller's deadline.
    #[error("task queue overflow")]
    Overflow,
    /// Operation attempted before activation or after deactivation.
    #[error("object is not active")]
    NotActive,
    /// Threads of this pool are already running.
    #[error("threads already started")]
    AlreadyStarted,
    /// The operating system refused to create a thread.
    #[error("os error: {0}")]
    Os(#[from] std::io::Error),
    /// A pool thread terminated abnormally and could not be joined cleanly.
    #[error("thread join failed: {0}")]
    Join(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Application-facing result used by user supplied work.
pub type AppResult<T> = Result<T, anyhow::Error>;
