//! # Prometheus Planner
//!
//! Thread pools, a bounded task queue and a timer-driven planner for
//! in-process background work on the Prometheus AI Platform.
//!
//! The crate implements the classic "timer thread feeds worker pool" design:
//!
//! - [`ThreadPool`](core::ThreadPool): a fixed set of OS threads, each bound to a
//!   [`Job`](core::Job), started behind a barrier so a failed start never leaves
//!   half the jobs running
//! - [`WorkerPool`](core::WorkerPool): a FIFO of [`Task`](core::Task)s drained by
//!   worker threads, with optional capacity and blocking backpressure
//! - [`Scheduler`](core::Scheduler): one thread delivering [`Goal`](core::Goal)s
//!   in due-time order, with optional drift compensation
//! - [`TaskGoal`](core::TaskGoal) / [`GoalTask`](core::GoalTask): goals whose
//!   delivery enqueues their body into a worker pool, so the scheduler thread
//!   never runs real work
//!
//! Failures inside user work are caught at the pool/scheduler boundary and
//! reported through an [`ErrorSink`](core::ErrorSink); they never kill a thread.
//!
//! ## Periodic work
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use prometheus_planner::builders::PlannerBuilder;
//! use prometheus_planner::config::{PlannerConfig, WorkerPoolConfig};
//! use prometheus_planner::core::ActiveObject;
//!
//! let planner = PlannerBuilder::new(PlannerConfig {
//!     pool: WorkerPoolConfig::new().with_thread_count(2),
//!     ..PlannerConfig::default()
//! })
//! .build()?;
//!
//! let runs = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&runs);
//! let tick = planner.goal_task(move |me| {
//!     if counter.fetch_add(1, Ordering::SeqCst) < 2 {
//!         me.schedule_after(Duration::from_millis(10))?;
//!     }
//!     Ok(())
//! });
//! tick.schedule_after(Duration::from_millis(10))?;
//!
//! std::thread::sleep(Duration::from_millis(200));
//! planner.deactivate();
//! planner.wait()?;
//! assert_eq!(runs.load(Ordering::SeqCst), 3);
//! # Ok::<(), prometheus_planner::core::PlannerError>(())
//! ```

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Thread pools, worker queue, scheduler and adapters.
pub mod core;
/// Configuration models for pools and the scheduler.
pub mod config;
/// Builders assembling services from configuration.
pub mod builders;
/// Runtime adapters for async executors.
pub mod runtime;
/// Synchronization building blocks.
pub mod sync;
/// Shared utilities.
pub mod util;
