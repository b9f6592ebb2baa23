//! Fixed-size pool of OS threads, each bound to one [`Job`] for its lifetime.
//!
//! The pool knows nothing about queues. It owns `N` slots created at
//! construction, starts any number of them at once, and joins them again.
//!
//! # Startup
//!
//! Every thread created by one `start` call parks on a shared [`StartGate`]
//! before it runs its job. The gate is only opened once all requested threads
//! exist. When spawning fails midway the gate is aborted instead, the threads
//! that were already created exit without running their job, they are joined,
//! and the spawn error is returned. A partial start therefore never leaves some
//! jobs running while their siblings failed to launch.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::report::{panic_message, run_guarded, ErrorSink, TracingSink};
use super::{Job, PlannerError};
use crate::sync::StartGate;

/// Body handed to a [`ThreadSpawner`].
pub type ThreadBody = Box<dyn FnOnce() + Send + 'static>;

/// Creates OS threads on behalf of a [`ThreadPool`].
pub trait ThreadSpawner: Send + Sync {
    /// Spawn a named thread running `body`.
    ///
    /// # Errors
    ///
    /// The OS error if the thread could not be created.
    fn spawn(
        &self,
        name: String,
        stack_size: Option<usize>,
        body: ThreadBody,
    ) -> io::Result<JoinHandle<()>>;
}

/// Spawner backed by [`std::thread::Builder`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OsThreadSpawner;

impl ThreadSpawner for OsThreadSpawner {
    fn spawn(
        &self,
        name: String,
        stack_size: Option<usize>,
        body: ThreadBody,
    ) -> io::Result<JoinHandle<()>> {
        let mut builder = thread::Builder::new().name(name);
        if let Some(size) = stack_size {
            builder = builder.stack_size(size);
        }
        builder.spawn(body)
    }
}

/// Pool of OS threads bound to jobs.
pub struct ThreadPool {
    name: String,
    jobs: Vec<Arc<dyn Job>>,
    stack_size: Option<usize>,
    spawner: Arc<dyn ThreadSpawner>,
    sink: Arc<dyn ErrorSink>,
    /// Handles of started threads, in slot order.
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Bind the same job to `count` threads.
    ///
    /// # Errors
    ///
    /// `PlannerError::InvalidArgument` if `count` is zero.
    pub fn with_job(job: Arc<dyn Job>, count: usize) -> Result<Self, PlannerError> {
        Self::from_jobs(std::iter::repeat_n(job, count))
    }

    /// Bind `count` jobs produced by `factory`, called once per slot index.
    ///
    /// # Errors
    ///
    /// `PlannerError::InvalidArgument` if `count` is zero.
    pub fn from_factory<F>(count: usize, factory: F) -> Result<Self, PlannerError>
    where
        F: FnMut(usize) -> Arc<dyn Job>,
    {
        Self::from_jobs((0..count).map(factory))
    }

    /// Bind one thread to each job in `jobs`.
    ///
    /// # Errors
    ///
    /// `PlannerError::InvalidArgument` if `jobs` is empty.
    pub fn from_jobs<I>(jobs: I) -> Result<Self, PlannerError>
    where
        I: IntoIterator<Item = Arc<dyn Job>>,
    {
        let jobs: Vec<_> = jobs.into_iter().collect();
        if jobs.is_empty() {
            return Err(PlannerError::InvalidArgument(
                "thread pool needs at least one job".into(),
            ));
        }
        Ok(Self {
            name: "thread-pool".into(),
            handles: Mutex::new(Vec::with_capacity(jobs.len())),
            jobs,
            stack_size: None,
            spawner: Arc::new(OsThreadSpawner),
            sink: Arc::new(TracingSink),
        })
    }

    /// Prefix used for thread names and log fields.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Stack size for every thread; `None` keeps the platform default.
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: Option<usize>) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Replace the OS spawner.
    #[must_use]
    pub fn with_spawner(mut self, spawner: Arc<dyn ThreadSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Sink receiving panics raised by jobs.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Number of slots.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.jobs.len()
    }

    /// Number of threads started and not yet joined.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// Start `to_start` threads (all slots when `None`).
    ///
    /// # Errors
    ///
    /// - `PlannerError::AlreadyStarted` if threads from an earlier start have not been joined
    /// - `PlannerError::InvalidArgument` if more threads are requested than slots exist
    /// - `PlannerError::Os` if the OS refused to create a thread; no job has run
    pub fn start(&self, to_start: Option<usize>) -> Result<(), PlannerError> {
        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            return Err(PlannerError::AlreadyStarted);
        }
        let count = to_start.unwrap_or(self.jobs.len());
        if count > self.jobs.len() {
            return Err(PlannerError::InvalidArgument(format!(
                "cannot start {count} threads, pool `{}` has {} slots",
                self.name,
                self.jobs.len()
            )));
        }
        let started = self.launch(0..count)?;
        *handles = started;
        info!(pool = %self.name, threads = count, "thread pool started");
        Ok(())
    }

    /// Start one more thread if an unstarted slot remains.
    ///
    /// Returns `false` when every slot is already running.
    ///
    /// # Errors
    ///
    /// `PlannerError::Os` if the OS refused to create the thread.
    pub fn start_one(&self) -> Result<bool, PlannerError> {
        let mut handles = self.handles.lock();
        let slot = handles.len();
        if slot >= self.jobs.len() {
            return Ok(false);
        }
        let mut started = self.launch(slot..slot + 1)?;
        handles.append(&mut started);
        debug!(pool = %self.name, slot, "thread pool grew by one");
        Ok(true)
    }

    fn launch(&self, slots: std::ops::Range<usize>) -> Result<Vec<JoinHandle<()>>, PlannerError> {
        let gate = Arc::new(StartGate::new());
        let mut created = Vec::with_capacity(slots.len());

        for slot in slots {
            let body = self.thread_body(slot, Arc::clone(&gate));
            let name = format!("{}-{slot}", self.name);
            match self.spawner.spawn(name, self.stack_size, body) {
                Ok(handle) => created.push(handle),
                Err(e) => {
                    error!(pool = %self.name, slot, error = %e, "thread creation failed, unwinding");
                    gate.abort();
                    for handle in created {
                        if handle.join().is_err() {
                            warn!(pool = %self.name, "aborted thread did not exit cleanly");
                        }
                    }
                    return Err(PlannerError::Os(e));
                }
            }
        }

        gate.open();
        Ok(created)
    }

    fn thread_body(&self, slot: usize, gate: Arc<StartGate>) -> ThreadBody {
        let job = Arc::clone(&self.jobs[slot]);
        let sink = Arc::clone(&self.sink);
        let pool = self.name.clone();
        Box::new(move || {
            if !gate.pass() {
                debug!(pool = %pool, slot, "start aborted, skipping job");
                return;
            }
            run_guarded(sink.as_ref(), "job", || {
                job.work();
                Ok(())
            });
            debug!(pool = %pool, slot, "job finished");
        })
    }

    /// Join every started thread.
    ///
    /// All threads are joined even if some fail; the first failure is returned.
    /// A thread of this pool calling this method skips joining itself.
    ///
    /// # Errors
    ///
    /// `PlannerError::Join` if a thread terminated abnormally.
    pub fn wait_for_completion(&self) -> Result<(), PlannerError> {
        let handles = std::mem::take(&mut *self.handles.lock());
        let current = thread::current().id();
        let mut first_error = None;

        for handle in handles {
            if handle.thread().id() == current {
                warn!(pool = %self.name, "not joining the calling thread");
                continue;
            }
            if let Err(payload) = handle.join() {
                let message = panic_message(payload.as_ref());
                warn!(pool = %self.name, error = %message, "thread join failed");
                first_error.get_or_insert(PlannerError::Join(message));
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.handles.get_mut().is_empty() {
            if let Err(e) = self.wait_for_completion() {
                warn!(pool = %self.name, error = %e, "thread pool dropped with failed threads");
            }
        }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("name", &self.name)
            .field("thread_count", &self.jobs.len())
            .field("running", &self.running_count())
            .finish_non_exhaustive()
    }
}
