//! Fixed-size transfer buffer that batches small writes
//!
//! Unlike [`RingBuffer`](crate::RingBuffer), a [`TransferBuffer`] keeps its
//! content at the front of a linear allocation and compacts on every read.
//! The reader is only woken once a minimum amount of data has accumulated,
//! trading latency for fewer, larger transfers. Writes that do not fit are
//! dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::{
    BufferConfig, ConfigError, DEFAULT_MIN_TRANSFER_SIZE, DEFAULT_TRANSFER_CAPACITY,
};
use crate::overflow::WriteOutcome;

#[derive(Debug)]
struct TransferState {
    data: Vec<u8>,
    capacity: usize,
    /// Latched once `min_transfer_size` bytes are queued, released when drained
    ready: bool,
    overflowing: bool,
    closed: bool,
}

/// Compacting byte buffer with a minimum transfer size
#[derive(Debug)]
pub struct TransferBuffer {
    /// Buffered bytes and flags
    state: Mutex<TransferState>,
    /// Signalled when the reader may proceed
    ready: Condvar,
    /// Bytes that must accumulate before the reader wakes
    min_transfer_size: usize,
    /// Liveness re-check interval for the blocked reader
    recheck: Duration,
    /// Bytes dropped because they did not fit
    bytes_lost: CachePadded<AtomicU64>,
}

impl TransferBuffer {
    /// Create a transfer buffer
    ///
    /// # Arguments
    ///
    /// * `capacity` - Bytes the buffer holds
    /// * `min_transfer_size` - Bytes to accumulate before waking the reader,
    ///   clamped to `1..=capacity`
    pub fn new(capacity: usize, min_transfer_size: usize) -> Self {
        let clamped = min_transfer_size.clamp(1, capacity.max(1));
        if clamped != min_transfer_size {
            warn!(
                capacity,
                requested = min_transfer_size,
                used = clamped,
                "minimum transfer size out of range, clamping"
            );
        }
        let min_transfer_size = clamped;

        Self {
            state: Mutex::new(TransferState {
                data: Vec::with_capacity(capacity),
                capacity,
                ready: false,
                overflowing: false,
                closed: false,
            }),
            ready: Condvar::new(),
            min_transfer_size,
            recheck: Duration::from_millis(500),
            bytes_lost: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Create a transfer buffer from the capacity, minimum transfer size and
    /// read re-check of a validated `config`
    pub fn from_config(config: &BufferConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            recheck: config.read_recheck,
            ..Self::new(config.capacity, config.min_transfer_size)
        })
    }

    /// Append `bytes`, dropping them if they do not fit
    pub fn write(&self, bytes: &[u8]) -> WriteOutcome {
        let mut state = self.state.lock();
        if state.closed {
            return WriteOutcome::Closed;
        }

        let outcome = if state.data.len() + bytes.len() <= state.capacity {
            state.data.extend_from_slice(bytes);
            if state.overflowing {
                state.overflowing = false;
                info!(
                    lost = self.bytes_lost.load(Ordering::Relaxed),
                    "transfer buffer accepting writes again"
                );
            }
            WriteOutcome::Written
        } else {
            self.bytes_lost.fetch_add(bytes.len() as u64, Ordering::Relaxed);
            if !state.overflowing {
                state.overflowing = true;
                warn!(
                    buffered = state.data.len(),
                    requested = bytes.len(),
                    "transfer buffer is full, dropping bytes"
                );
            }
            WriteOutcome::Dropped
        };

        // A full buffer releases the reader even below the minimum, otherwise
        // chunk sizes that do not divide the capacity would stall it
        let full = outcome == WriteOutcome::Dropped && !state.data.is_empty();
        if !state.ready && (full || state.data.len() >= self.min_transfer_size) {
            state.ready = true;
            self.ready.notify_one();
        }
        outcome
    }

    /// Read into `out` once enough data has accumulated
    ///
    /// Blocks until at least `min_transfer_size` bytes are buffered or the
    /// buffer is closed. After a partial read the reader stays released
    /// until the buffer has been drained. Returns `0` once closed and empty.
    pub fn read_into(&self, out: &mut [u8]) -> usize {
        if out.is_empty() {
            return 0;
        }

        let mut state = self.state.lock();
        while !state.ready && !state.closed {
            self.ready.wait_for(&mut state, self.recheck);
        }

        let n = out.len().min(state.data.len());
        out[..n].copy_from_slice(&state.data[..n]);
        state.data.drain(..n);
        if state.data.is_empty() && !state.closed {
            state.ready = false;
        }

        // Hand the lock straight to a waiting producer
        MutexGuard::unlock_fair(state);
        n
    }

    /// Release the reader and refuse further writes
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.ready.notify_all();
        debug!(buffered = state.data.len(), "closed transfer buffer");
    }

    /// Discard all content and reopen
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.data.clear();
        state.ready = false;
        state.overflowing = false;
        state.closed = false;
        self.bytes_lost.store(0, Ordering::Relaxed);
    }

    /// Bytes currently buffered
    pub fn read_available(&self) -> usize {
        self.state.lock().data.len()
    }

    /// Bytes dropped since creation or the last clear
    pub fn bytes_lost(&self) -> u64 {
        self.bytes_lost.load(Ordering::Relaxed)
    }

    /// Total size of the buffer
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Bytes that must accumulate before the reader wakes
    pub fn min_transfer_size(&self) -> usize {
        self.min_transfer_size
    }

    /// True once closed and not cleared
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Default for TransferBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSFER_CAPACITY, DEFAULT_MIN_TRANSFER_SIZE)
    }
}
