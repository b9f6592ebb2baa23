//! Diagnostics channel for failures raised inside user work.
//!
//! Pools and the scheduler never let a failing `Job`, `Task` or `Goal` unwind
//! into their own bookkeeping. Errors and panics are caught at the boundary and
//! handed to an [`ErrorSink`], which by default forwards them to `tracing`.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, warn};

/// How bad a reported condition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Recoverable condition worth noting.
    Warning,
    /// User work returned an error.
    Error,
    /// User work panicked.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Receiver of diagnostics produced by pool and scheduler threads.
///
/// Implementations are called from worker and scheduler threads and must not
/// block for long.
pub trait ErrorSink: Send + Sync {
    /// Record a failure.
    fn report(&self, severity: Severity, message: &str);
}

/// Default sink that emits every report as a tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Warning => warn!(%severity, "{message}"),
            Severity::Error | Severity::Critical => error!(%severity, "{message}"),
        }
    }
}

/// Run user work, reporting returned errors and caught panics to `sink`.
///
/// Returns `true` when the work completed without error.
pub(crate) fn run_guarded<F>(sink: &dyn ErrorSink, what: &str, work: F) -> bool
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            sink.report(Severity::Error, &format!("{what} failed: {e:#}"));
            false
        }
        Err(payload) => {
            sink.report(
                Severity::Critical,
                &format!("{what} panicked: {}", panic_message(payload.as_ref())),
            );
            false
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
