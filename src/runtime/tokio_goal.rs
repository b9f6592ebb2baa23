//! Goal that spawns a future onto a tokio runtime when delivered.
//!
//! Delivery only spawns, so the scheduler thread is never blocked by the
//! future. Errors the future resolves to are reported through the sink.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::trace;

use crate::core::{AppResult, ErrorSink, Goal, PlannerError, Severity};

type GoalFuture = Pin<Box<dyn Future<Output = AppResult<()>> + Send>>;
type FutureFactory = Box<dyn Fn() -> GoalFuture + Send + Sync>;

/// Goal running a fresh future on a tokio runtime per delivery.
pub struct AsyncGoal {
    handle: Handle,
    sink: Arc<dyn ErrorSink>,
    make: FutureFactory,
}

impl AsyncGoal {
    /// Create a goal spawning `make()` onto the runtime behind `handle`.
    pub fn new<F, Fut>(handle: Handle, sink: Arc<dyn ErrorSink>, make: F) -> Arc<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        Arc::new(Self {
            handle,
            sink,
            make: Box::new(move || -> GoalFuture { Box::pin(make()) }),
        })
    }

    /// Create a goal bound to the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// `PlannerError::InvalidArgument` when called outside a tokio runtime.
    pub fn current<F, Fut>(sink: Arc<dyn ErrorSink>, make: F) -> Result<Arc<Self>, PlannerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        let handle = Handle::try_current()
            .map_err(|e| PlannerError::InvalidArgument(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(handle, sink, make))
    }
}

impl Goal for AsyncGoal {
    fn deliver(&self) -> AppResult<()> {
        let fut = (self.make)();
        let sink = Arc::clone(&self.sink);
        self.handle.spawn(async move {
            if let Err(e) = fut.await {
                sink.report(Severity::Error, &format!("async goal failed: {e:#}"));
            }
        });
        trace!("async goal spawned");
        Ok(())
    }
}
