//! Wait/notify mechanism shared by blocked readers and writers

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, MutexGuard};

/// Why a blocked call woke up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The awaited condition holds (or, for writers, it is worth re-checking)
    Ready,
    /// The buffer was closed
    Closed,
    /// The waiter was interrupted
    Interrupted,
}

/// Condition variable plus the close and interrupt flags
///
/// Waiters pass in the guard of the mutex that protects the state they are
/// waiting on. Every wait is bounded by a re-check interval so a lost
/// notification costs at most one interval.
#[derive(Debug)]
pub struct BlockingGate {
    condvar: Condvar,
    closed: AtomicBool,
    interrupted: AtomicBool,
    read_recheck: Duration,
    write_recheck: Duration,
}

impl BlockingGate {
    /// Create an open gate
    ///
    /// # Arguments
    ///
    /// * `read_recheck` - Upper bound on a single reader wait
    /// * `write_recheck` - Upper bound on a single writer wait
    pub fn new(read_recheck: Duration, write_recheck: Duration) -> Self {
        Self {
            condvar: Condvar::new(),
            closed: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
            read_recheck,
            write_recheck,
        }
    }

    /// Block until `ready` holds, the gate closes, or the waiter is interrupted
    ///
    /// Readiness wins over closing so that buffered data is still delivered
    /// after [`close`](Self::close).
    pub fn wait_for_data<T>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        mut ready: impl FnMut(&T) -> bool,
    ) -> Wake {
        loop {
            if ready(&**guard) {
                return Wake::Ready;
            }
            if let Some(wake) = self.cancelled() {
                return wake;
            }
            self.condvar.wait_for(guard, self.read_recheck);
        }
    }

    /// Wait once for a change that may have freed space
    ///
    /// Returns [`Wake::Ready`] after a notification or a timeout; the caller
    /// re-checks its own condition and calls again if needed.
    pub fn wait_for_space<T>(&self, guard: &mut MutexGuard<'_, T>) -> Wake {
        if let Some(wake) = self.cancelled() {
            return wake;
        }
        self.condvar.wait_for(guard, self.write_recheck);
        self.cancelled().unwrap_or(Wake::Ready)
    }

    /// Wake every waiter so it re-checks its condition
    #[inline]
    pub fn signal(&self) {
        self.condvar.notify_all();
    }

    /// Mark the gate closed and wake every waiter
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    /// Clear the closed and interrupted flags
    pub fn reopen(&self) {
        self.closed.store(false, Ordering::Release);
        self.interrupted.store(false, Ordering::Release);
    }

    /// Wake the current (or next) blocked waiter with [`Wake::Interrupted`]
    ///
    /// The flag is consumed by the first waiter that observes it.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    /// True once [`close`](Self::close) has been called
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn cancelled(&self) -> Option<Wake> {
        if self.interrupted.swap(false, Ordering::AcqRel) {
            Some(Wake::Interrupted)
        } else if self.is_closed() {
            Some(Wake::Closed)
        } else {
            None
        }
    }
}
