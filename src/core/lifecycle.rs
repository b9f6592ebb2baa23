//! Tri-phase lifecycle shared by every threaded service in the crate.

use super::PlannerError;

/// Service owning threads that are started, told to stop, and joined.
///
/// `deactivate` only signals and never blocks; a set of services can be told
/// to stop before any of them is waited for.
pub trait ActiveObject {
    /// Start the service's threads and begin accepting work.
    ///
    /// # Errors
    ///
    /// `PlannerError::AlreadyStarted` if the threads of a previous activation
    /// have not been waited for, or the error that prevented startup.
    fn activate(&self) -> Result<(), PlannerError>;

    /// Stop accepting work and wake the service's threads so they can exit.
    fn deactivate(&self);

    /// Join the service's threads.
    ///
    /// # Errors
    ///
    /// `PlannerError::Join` if a thread terminated abnormally.
    fn wait(&self) -> Result<(), PlannerError>;

    /// Whether the service currently accepts work.
    fn is_active(&self) -> bool;
}
