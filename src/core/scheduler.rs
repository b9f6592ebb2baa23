//! Single-threaded, time-ordered goal scheduler.
//!
//! One dedicated thread owns a min-heap of `(due time, goal)` entries and
//! moves through these phases:
//!
//! - **Idle**: no entries, parked without a timeout
//! - **Armed**: parked until the earliest entry is due
//! - **Delivering**: the earliest entry is due; it is popped and its goal is
//!   delivered on this thread with the lock released, then the heap is
//!   re-examined
//! - **Stopped**: after `deactivate`
//!
//! `schedule` wakes the thread only when the new entry is due before the time
//! it is currently parked until. The thread always recomputes the minimum on
//! wake-up, so spurious wake-ups are harmless.
//!
//! # Drift compensation
//!
//! With `delivery_time_adjustment` enabled the scheduler keeps a running
//! average of how late it fired relative to the time it aimed for, and aims
//! that much earlier for subsequent entries. The shift is capped by
//! `max_delivery_shift_ms`. Entries already due when scheduled never move the
//! shift. The option is off by default, in which case no
//! entry ever fires before its due time.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info, trace, warn};

use super::report::{run_guarded, ErrorSink};
use super::work::identity;
use super::{ActiveObject, Goal, Job, PlannerError, ThreadPool};
use crate::config::SchedulerConfig;
use crate::util::clock::deadline_after;

/// A goal waiting in the scheduler.
struct ScheduleEntry {
    due: Instant,
    /// Insertion order; keeps equal due times first-in first-out.
    seq: u64,
    /// Whether `due` was still ahead when the entry was inserted. Only such
    /// entries feed drift compensation.
    timed: bool,
    goal: Arc<dyn Goal>,
}

impl PartialEq for ScheduleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for ScheduleEntry {}

impl PartialOrd for ScheduleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduleEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed: BinaryHeap is a max-heap, the earliest entry must be on top.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Armed(Instant),
    Delivering,
    Stopped,
}

struct PlanState {
    entries: BinaryHeap<ScheduleEntry>,
    next_seq: u64,
    running: bool,
    phase: Phase,
    delivery_shift: Duration,
}

struct PlanShared {
    name: String,
    state: Mutex<PlanState>,
    wake: Condvar,
    sink: Arc<dyn ErrorSink>,
    adjust_delivery_time: bool,
    max_delivery_shift: Duration,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl PlanShared {
    fn aim(&self, due: Instant, shift: Duration) -> Instant {
        if self.adjust_delivery_time {
            due.checked_sub(shift).unwrap_or(due)
        } else {
            due
        }
    }
}

/// Statistics about scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Entries waiting to be delivered.
    pub pending: usize,
    /// Goals delivered without error.
    pub delivered: u64,
    /// Goals whose delivery returned an error or panicked.
    pub failed: u64,
    /// Current drift compensation; zero unless adjustment is enabled.
    pub delivery_shift: Duration,
}

/// Job run by the scheduler thread.
struct PlannerLoop {
    shared: Arc<PlanShared>,
}

impl Job for PlannerLoop {
    fn work(&self) {
        let shared = &self.shared;
        debug!(scheduler = %shared.name, "scheduler thread started");
        let mut state = shared.state.lock();

        while state.running {
            let Some(due) = state.entries.peek().map(|e| e.due) else {
                state.phase = Phase::Idle;
                shared.wake.wait(&mut state);
                continue;
            };

            let aim = shared.aim(due, state.delivery_shift);
            let now = Instant::now();
            if aim > now {
                state.phase = Phase::Armed(aim);
                shared.wake.wait_until(&mut state, aim);
                continue;
            }

            let Some(entry) = state.entries.pop() else {
                continue;
            };
            state.phase = Phase::Delivering;
            if shared.adjust_delivery_time && entry.timed {
                let late = now.saturating_duration_since(aim);
                state.delivery_shift =
                    ((state.delivery_shift + late) / 2).min(shared.max_delivery_shift);
            }
            trace!(
                scheduler = %shared.name,
                late_us = now.saturating_duration_since(entry.due).as_micros(),
                "delivering goal"
            );

            MutexGuard::unlocked(&mut state, || {
                let ok = run_guarded(shared.sink.as_ref(), "goal", || entry.goal.deliver());
                let counter = if ok { &shared.delivered } else { &shared.failed };
                counter.fetch_add(1, Ordering::Relaxed);
                // May release the last handle to this scheduler.
                drop(entry);
            });
        }

        state.phase = Phase::Stopped;
        debug!(scheduler = %shared.name, "scheduler thread exiting");
    }
}

/// Time-ordered scheduler delivering goals on its own thread.
pub struct Scheduler {
    name: String,
    shared: Arc<PlanShared>,
    thread: ThreadPool,
    lifecycle: Mutex<()>,
}

impl Scheduler {
    /// Create a scheduler and, if `config.start_thread` is set, activate it.
    ///
    /// `sink` receives errors and panics raised by goals.
    ///
    /// # Errors
    ///
    /// - `PlannerError::InvalidConfig` if the configuration is invalid
    /// - `PlannerError::Os` if the scheduler thread could not be created
    pub fn new(config: &SchedulerConfig, sink: Arc<dyn ErrorSink>) -> Result<Self, PlannerError> {
        config.validate().map_err(PlannerError::InvalidConfig)?;

        let name = config.resolved_name();
        let shared = Arc::new(PlanShared {
            name: name.clone(),
            state: Mutex::new(PlanState {
                entries: BinaryHeap::new(),
                next_seq: 0,
                running: false,
                phase: Phase::Stopped,
                delivery_shift: Duration::ZERO,
            }),
            wake: Condvar::new(),
            sink: Arc::clone(&sink),
            adjust_delivery_time: config.delivery_time_adjustment,
            max_delivery_shift: Duration::from_millis(config.max_delivery_shift_ms),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        });
        let job: Arc<dyn Job> = Arc::new(PlannerLoop {
            shared: Arc::clone(&shared),
        });
        let thread = ThreadPool::with_job(job, 1)?
            .with_name(name.clone())
            .with_stack_size(config.stack_size)
            .with_sink(sink);

        let scheduler = Self {
            name,
            shared,
            thread,
            lifecycle: Mutex::new(()),
        };
        info!(
            scheduler = %scheduler.name,
            delivery_time_adjustment = config.delivery_time_adjustment,
            "Scheduler initialized"
        );

        if config.start_thread {
            scheduler.activate()?;
        }
        Ok(scheduler)
    }

    /// Instance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deliver `goal` once `at` is reached. Never blocks on delivery.
    ///
    /// The same goal may be scheduled several times; each entry is delivered
    /// separately.
    ///
    /// # Errors
    ///
    /// `PlannerError::NotActive` if the scheduler is not running.
    pub fn schedule(&self, goal: Arc<dyn Goal>, at: Instant) -> Result<(), PlannerError> {
        let mut state = self.shared.state.lock();
        if !state.running {
            return Err(PlannerError::NotActive);
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        let timed = at > Instant::now();
        state.entries.push(ScheduleEntry {
            due: at,
            seq,
            timed,
            goal,
        });

        let aim = self.shared.aim(at, state.delivery_shift);
        let wake = match state.phase {
            Phase::Idle => true,
            Phase::Armed(until) => aim < until,
            Phase::Delivering | Phase::Stopped => false,
        };
        drop(state);

        if wake {
            self.shared.wake.notify_one();
        }
        Ok(())
    }

    /// [`schedule`](Self::schedule) `delay` from now.
    ///
    /// # Errors
    ///
    /// `PlannerError::NotActive` if the scheduler is not running.
    pub fn schedule_after(&self, goal: Arc<dyn Goal>, delay: Duration) -> Result<(), PlannerError> {
        self.schedule(goal, deadline_after(delay))
    }

    /// Remove every pending entry referencing `goal`; returns how many were removed.
    ///
    /// An entry whose delivery has already begun cannot be retracted.
    pub fn unschedule<G: Goal + ?Sized>(&self, goal: &Arc<G>) -> usize {
        let target = identity(goal);
        let mut state = self.shared.state.lock();
        let before = state.entries.len();
        state.entries.retain(|e| identity(&e.goal) != target);
        let removed = before - state.entries.len();
        drop(state);

        if removed > 0 {
            debug!(scheduler = %self.name, removed, "goal unscheduled");
        }
        removed
    }

    /// Discard every pending entry without delivering it; returns how many were discarded.
    pub fn clear(&self) -> usize {
        let discarded = std::mem::take(&mut self.shared.state.lock().entries);
        let count = discarded.len();
        // Goals may own services; release them unlocked.
        drop(discarded);
        count
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    /// Whether no entry is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of scheduler statistics.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let state = self.shared.state.lock();
        SchedulerStats {
            pending: state.entries.len(),
            delivered: self.shared.delivered.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            delivery_shift: state.delivery_shift,
        }
    }
}

impl ActiveObject for Scheduler {
    fn activate(&self) -> Result<(), PlannerError> {
        let _lifecycle = self.lifecycle.lock();
        if self.thread.running_count() > 0 {
            return Err(PlannerError::AlreadyStarted);
        }
        self.shared.state.lock().running = true;
        if let Err(e) = self.thread.start(None) {
            self.shared.state.lock().running = false;
            return Err(e);
        }
        info!(scheduler = %self.name, "Scheduler activated");
        Ok(())
    }

    fn deactivate(&self) {
        let _lifecycle = self.lifecycle.lock();
        let mut state = self.shared.state.lock();
        if state.running {
            state.running = false;
            let pending = state.entries.len();
            drop(state);
            self.shared.wake.notify_all();
            info!(scheduler = %self.name, pending, "Scheduler deactivated");
        }
    }

    fn wait(&self) -> Result<(), PlannerError> {
        let _lifecycle = self.lifecycle.lock();
        let joined = self.thread.wait_for_completion();
        if !self.shared.state.lock().running {
            let discarded = self.clear();
            if discarded > 0 {
                warn!(scheduler = %self.name, discarded, "goals dropped at shutdown");
            }
        }
        joined
    }

    fn is_active(&self) -> bool {
        self.shared.state.lock().running
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.deactivate();
        if let Err(e) = self.wait() {
            warn!(scheduler = %self.name, error = %e, "Scheduler dropped with a failed thread");
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.name)
            .field("pending", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TracingSink;

    fn entry(due: Instant, seq: u64) -> ScheduleEntry {
        ScheduleEntry {
            due,
            seq,
            timed: true,
            goal: Arc::new(|| -> anyhow::Result<()> { Ok(()) }),
        }
    }

    #[test]
    fn test_heap_pops_earliest_then_insertion_order() {
        let base = Instant::now();
        let mut heap = BinaryHeap::new();
        heap.push(entry(base + Duration::from_millis(30), 0));
        heap.push(entry(base + Duration::from_millis(10), 1));
        heap.push(entry(base + Duration::from_millis(10), 2));
        heap.push(entry(base + Duration::from_millis(20), 3));

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_schedule_requires_activation() {
        let scheduler = Scheduler::new(
            &SchedulerConfig::new().with_start_thread(false),
            Arc::new(TracingSink),
        )
        .unwrap();
        let goal: Arc<dyn Goal> = Arc::new(|| -> anyhow::Result<()> { Ok(()) });
        assert!(matches!(
            scheduler.schedule(goal, Instant::now()),
            Err(PlannerError::NotActive)
        ));
    }

    #[test]
    fn test_aim_without_adjustment_is_due_time() {
        let scheduler = Scheduler::new(
            &SchedulerConfig::new().with_start_thread(false),
            Arc::new(TracingSink),
        )
        .unwrap();
        let due = Instant::now() + Duration::from_secs(1);
        assert_eq!(scheduler.shared.aim(due, Duration::from_millis(50)), due);
    }

    #[test]
    fn test_clear_and_len() {
        let scheduler = Scheduler::new(&SchedulerConfig::new(), Arc::new(TracingSink)).unwrap();
        let far = Instant::now() + Duration::from_secs(3600);
        for _ in 0..3 {
            let goal: Arc<dyn Goal> = Arc::new(|| -> anyhow::Result<()> { Ok(()) });
            scheduler.schedule(goal, far).unwrap();
        }
        assert_eq!(scheduler.len(), 3);
        assert_eq!(scheduler.clear(), 3);
        assert!(scheduler.is_empty());
    }
}
