//! Pending operation barrier.
//!
//! Asynchronous cookie mutations register themselves with a
//! [`PendingOperationBarrier`] before they are scheduled and signal completion
//! once their work has run. Any thread may block on the barrier until every
//! registered operation has finished, e.g. before flushing the store or tearing
//! down state.
//!
//! The barrier is a monitor: a mutex-protected counter plus a condition
//! variable. Waiters release the mutex while blocked, so `start()` and
//! `complete()` callers are never starved by them.
//!
//! ```rust
//! use std::sync::Arc;
//! use gosub_cookies::cookies::PendingOperationBarrier;
//!
//! let barrier = Arc::new(PendingOperationBarrier::new());
//! let op = barrier.begin();
//! let worker = std::thread::spawn(move || {
//!     // ... do the work ...
//!     drop(op);
//! });
//! barrier.wait_until_idle();
//! assert_eq!(barrier.pending(), 0);
//! worker.join().unwrap();
//! ```

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct PendingOperationBarrier {
    pending: Mutex<usize>,
    idle: Condvar,
}

impl PendingOperationBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers one outstanding operation.
    pub fn start(&self) {
        let mut pending = self.lock();
        *pending += 1;
        log::trace!("cookie operation started ({} pending)", *pending);
    }

    /// Marks one operation as finished and wakes every waiter once none are left.
    ///
    /// # Panics
    /// Panics when called without a matching [`start`](Self::start). An unbalanced
    /// completion means the idle signal can no longer be trusted.
    pub fn complete(&self) {
        let mut pending = self.lock();
        if *pending == 0 {
            drop(pending);
            log::error!("cookie operation completed without a matching start");
            panic!("PendingOperationBarrier::complete called with no pending operations");
        }

        *pending -= 1;
        log::trace!("cookie operation completed ({} pending)", *pending);
        if *pending == 0 {
            self.idle.notify_all();
        }
    }

    /// Registers one operation and returns a guard that completes it when dropped.
    ///
    /// The guard completes exactly once, also when the task holding it panics or
    /// is dropped without running.
    pub fn begin(self: &Arc<Self>) -> PendingOperation {
        self.start();
        PendingOperation {
            barrier: Arc::clone(self),
        }
    }

    /// Number of operations that have started but not completed.
    pub fn pending(&self) -> usize {
        *self.lock()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Blocks the calling thread until no operations are pending.
    pub fn wait_until_idle(&self) {
        let guard = self.lock();
        let _guard = self
            .idle
            .wait_while(guard, |pending| *pending > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Like [`wait_until_idle`](Self::wait_until_idle) but gives up after `timeout`.
    ///
    /// Returns `true` when the barrier was idle on return.
    pub fn wait_until_idle_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _result) = self
            .idle
            .wait_timeout_while(guard, timeout, |pending| *pending > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == 0
    }
}

/// Outstanding operation registered through [`PendingOperationBarrier::begin`].
#[derive(Debug)]
#[must_use = "dropping the guard completes the operation immediately"]
pub struct PendingOperation {
    barrier: Arc<PendingOperationBarrier>,
}

impl Drop for PendingOperation {
    fn drop(&mut self) {
        self.barrier.complete();
    }
}
