//! Startup gate shared by the threads created in one `ThreadPool::start` call.
//!
//! Freshly spawned threads park on the gate before touching their job. Once
//! every requested thread exists the starter opens the gate and all of them
//! proceed. If spawning fails halfway the starter aborts the gate instead, and
//! the threads already created leave without ever running their job.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Closed,
    Open,
    Aborted,
}

/// One-shot broadcast barrier with an abort path.
#[derive(Debug)]
pub struct StartGate {
    state: Mutex<GateState>,
    cvar: Condvar,
}

impl StartGate {
    /// Create a closed gate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Closed),
            cvar: Condvar::new(),
        }
    }

    /// Block until the gate is opened or aborted.
    ///
    /// Returns `true` if the caller may run its work.
    pub fn pass(&self) -> bool {
        let mut state = self.state.lock();
        self.cvar.wait_while(&mut state, |s| *s == GateState::Closed);
        *state == GateState::Open
    }

    /// Let every waiting and future passer through.
    pub fn open(&self) {
        self.settle(GateState::Open);
    }

    /// Turn every waiting and future passer away.
    pub fn abort(&self) {
        self.settle(GateState::Aborted);
    }

    fn settle(&self, to: GateState) {
        let mut state = self.state.lock();
        // First decision wins.
        if *state == GateState::Closed {
            *state = to;
        }
        drop(state);
        self.cvar.notify_all();
    }
}

impl Default for StartGate {
    fn default() -> Self {
        Self::new()
    }
}
