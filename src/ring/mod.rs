//! Core ring storage and the consumer wait mechanism
//!
//! This module holds the two policy-free building blocks of the buffer:
//!
//! - [`RingStore`](store::RingStore): fixed-capacity byte storage with read/write cursors and
//!   wrap counters
//! - [`BlockingGate`](gate::BlockingGate): blocks the consumer until bytes exist, the buffer is
//!   closed, or the waiter is interrupted
//!
//! Positions are tracked per cursor as an `(index, passes)` pair. Combined with
//! the store capacity (and the store origin after a growth) this yields an
//! absolute, monotonically increasing position in the stream, which is what
//! seeks and peeks are expressed in.

pub mod gate;
pub mod store;

/// A read or write position inside a [`RingStore`](store::RingStore)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Physical index in `[0, capacity)`
    pub index: usize,
    /// Number of times the cursor wrapped past the end of storage
    pub passes: u64,
}

impl Cursor {
    /// Create a new cursor
    pub fn new(index: usize, passes: u64) -> Self {
        Self { index, passes }
    }

    /// Absolute stream position of this cursor
    ///
    /// `origin` is the absolute position of physical index 0 on pass 0.
    pub fn absolute(&self, capacity: usize, origin: u64) -> u64 {
        origin + self.passes * capacity as u64 + self.index as u64
    }

    /// Cursor for an absolute position
    pub fn from_absolute(absolute: u64, capacity: usize, origin: u64) -> Self {
        let relative = absolute - origin;
        Self {
            index: (relative % capacity as u64) as usize,
            passes: relative / capacity as u64,
        }
    }

    /// Move forward `n` bytes, wrapping at most once
    pub(crate) fn advance(&mut self, n: usize, capacity: usize) {
        debug_assert!(n <= capacity, "cursor cannot move more than one lap");
        let next = self.index + n;
        if next >= capacity {
            self.index = next - capacity;
            self.passes += 1;
        } else {
            self.index = next;
        }
    }
}
