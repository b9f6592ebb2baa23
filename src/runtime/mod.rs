//! Runtime adapters bridging the scheduler to async runtimes.

#[cfg(feature = "tokio-runtime")]
pub mod tokio_goal;

#[cfg(feature = "tokio-runtime")]
pub use tokio_goal::AsyncGoal;
