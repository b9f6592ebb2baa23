//! Shared task queue and the worker loop that drains it.
//!
//! Design:
//! - One `parking_lot::Mutex` guards the deque, the accepting flag and the
//!   executing count
//! - `not_empty` parks workers, `not_full` parks producers of a bounded queue,
//!   `exhausted` parks callers of `wait_for_queue_exhausting`
//! - Tasks are executed and dropped with the lock released

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use super::PoolCounters;
use crate::core::report::{run_guarded, ErrorSink};
use crate::core::{Job, PlannerError, Task};

struct QueueState {
    tasks: VecDeque<Arc<dyn Task>>,
    accepting: bool,
    executing: usize,
}

pub(crate) struct TaskQueue {
    pool: String,
    /// `None` for an unbounded queue.
    capacity: Option<usize>,
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    exhausted: Condvar,
    pub(crate) counters: PoolCounters,
    pub(crate) sink: Arc<dyn ErrorSink>,
}

impl TaskQueue {
    pub(crate) fn new(pool: String, max_pending_tasks: usize, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            pool,
            capacity: (max_pending_tasks > 0).then_some(max_pending_tasks),
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                accepting: false,
                executing: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            exhausted: Condvar::new(),
            counters: PoolCounters::default(),
            sink,
        }
    }

    pub(crate) fn open(&self) {
        self.state.lock().accepting = true;
    }

    /// Stop accepting and wake everybody parked on the queue.
    pub(crate) fn close(&self) {
        self.state.lock().accepting = false;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub(crate) fn is_accepting(&self) -> bool {
        self.state.lock().accepting
    }

    /// Append `task`, blocking on a full bounded queue until `deadline`.
    pub(crate) fn push(
        &self,
        task: Arc<dyn Task>,
        deadline: Option<Instant>,
    ) -> Result<(), PlannerError> {
        let mut state = self.state.lock();
        loop {
            if !state.accepting {
                drop(state);
                self.counters.rejected_tasks.fetch_add(1, Ordering::Relaxed);
                return Err(PlannerError::NotActive);
            }
            let Some(capacity) = self.capacity else { break };
            if state.tasks.len() < capacity {
                break;
            }
            match deadline {
                None => self.not_full.wait(&mut state),
                Some(deadline) => {
                    let timed_out = self.not_full.wait_until(&mut state, deadline).timed_out();
                    if timed_out && state.accepting && state.tasks.len() >= capacity {
                        drop(state);
                        self.counters.rejected_tasks.fetch_add(1, Ordering::Relaxed);
                        warn!(pool = %self.pool, capacity, "task queue overflow");
                        return Err(PlannerError::Overflow);
                    }
                }
            }
        }

        state.tasks.push_back(task);
        let pending = state.tasks.len();
        drop(state);

        self.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
        trace!(pool = %self.pool, pending, "task enqueued");
        self.not_empty.notify_one();
        Ok(())
    }

    /// Take the head task, parking while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    fn pop(&self) -> Option<Arc<dyn Task>> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                state.executing += 1;
                let drained = state.tasks.is_empty();
                drop(state);
                if self.capacity.is_some() {
                    self.not_full.notify_one();
                }
                if drained {
                    self.exhausted.notify_all();
                }
                return Some(task);
            }
            if !state.accepting {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    fn finish(&self, succeeded: bool) {
        self.state.lock().executing -= 1;
        let counter = if succeeded {
            &self.counters.completed_tasks
        } else {
            &self.counters.failed_tasks
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub(crate) fn executing(&self) -> usize {
        self.state.lock().executing
    }

    /// Drop every queued task without running it; returns how many were dropped.
    pub(crate) fn clear(&self) -> usize {
        let discarded = std::mem::take(&mut self.state.lock().tasks);
        if self.capacity.is_some() {
            self.not_full.notify_all();
        }
        self.exhausted.notify_all();

        let count = discarded.len();
        self.counters
            .discarded_tasks
            .fetch_add(count as u64, Ordering::Relaxed);
        // Tasks may own the last handle to their pool; release them unlocked.
        drop(discarded);
        count
    }

    pub(crate) fn wait_exhausted(&self) {
        let mut state = self.state.lock();
        self.exhausted.wait_while(&mut state, |s| !s.tasks.is_empty());
    }
}

/// Job bound to every worker thread of a `WorkerPool`.
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) queue: Arc<TaskQueue>,
}

impl Job for Worker {
    fn work(&self) {
        debug!(pool = %self.queue.pool, worker_id = self.id, "worker started");
        while let Some(task) = self.queue.pop() {
            let ok = run_guarded(self.queue.sink.as_ref(), "task", || task.execute());
            self.queue.finish(ok);
            drop(task);
        }
        debug!(pool = %self.queue.pool, worker_id = self.id, "worker exiting");
    }
}
