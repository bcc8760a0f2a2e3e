//! Cancellable stop flag shared between the tick loop and its controllers.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Exit flag checked once per iteration boundary, with a sleep that wakes
/// early when the flag is raised.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    /// Create a cleared signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the loop to exit after its current iteration
    pub fn stop(&self) {
        let mut stopped = self.stopped.lock();
        *stopped = true;
        self.wake.notify_all();
    }

    /// Clear a previous stop request so the loop can run again
    pub fn clear(&self) {
        *self.stopped.lock() = false;
    }

    /// Has a stop been requested?
    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep for at most `duration`, returning early if a stop is requested.
    ///
    /// Returns true when the signal is raised.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}
