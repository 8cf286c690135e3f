//! Seekable ring buffer between a tuner producer and a stream consumer
//!
//! [`RingBuffer`] composes the building blocks of this crate:
//!
//! - [`RingStore`] for storage and cursors
//! - [`BlockingGate`] for blocking reads and blocking writes
//! - [`OverflowPolicy`] for writes that do not fit
//! - the [`seek`](crate::seek) module for origin-relative cursor moves
//!
//! Producers call [`RingBuffer::write`], which never blocks, from the network
//! receive thread. A single consumer calls [`RingBuffer::read`] or
//! [`RingBuffer::read_into`], which block only while nothing is readable.
//!
//! Locks are always taken writer side first, then the store. A reader only
//! ever holds the store lock while copying; any queue draining it triggers
//! happens after that lock is released.

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::{BufferConfig, ConfigError};
use crate::error::{BufferError, Result};
use crate::overflow::{
    BufferStats, OverflowEpisode, OverflowPolicy, OverflowQueue, OverflowStats, WriteOutcome,
};
use crate::ring::gate::{BlockingGate, Wake};
use crate::ring::store::RingStore;
use crate::seek::{self, SeekOrigin};

/// State owned by the writer-side lock
#[derive(Debug)]
struct WriteSide {
    /// Overflow policy, including any spill queue and growth sizing
    policy: OverflowPolicy,
    /// Logging state of the current overflow episode
    episode: OverflowEpisode,
}

/// Concurrent byte ring with overflow handling and seeking
#[derive(Debug)]
pub struct RingBuffer {
    /// Writer-side lock: overflow queue and growth
    writer: Mutex<WriteSide>,
    /// Reader-side lock: storage, cursors and pass counters
    store: Mutex<RingStore>,
    /// Wakes blocked readers and writers
    gate: BlockingGate,
    /// Loss, spill and growth counters
    stats: OverflowStats,
    /// Capacity the buffer was created with
    min_capacity: usize,
}

impl RingBuffer {
    /// Create a spilling buffer with default knobs scaled to `capacity`
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`.
    pub fn new(capacity: usize) -> Self {
        let config = BufferConfig::new(capacity);
        Self::build(&config)
    }

    /// Create a buffer from a validated configuration
    pub fn with_config(config: BufferConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(&config))
    }

    fn build(config: &BufferConfig) -> Self {
        debug!(
            capacity = config.capacity,
            policy = ?config.policy,
            "creating ring buffer"
        );
        Self {
            writer: Mutex::new(WriteSide {
                policy: OverflowPolicy::from_config(config),
                episode: OverflowEpisode::default(),
            }),
            store: Mutex::new(RingStore::new(config.capacity)),
            gate: BlockingGate::new(config.read_recheck, config.write_recheck),
            stats: OverflowStats::default(),
            min_capacity: config.capacity,
        }
    }

    /// Write `bytes` without blocking
    ///
    /// Spilled bytes are drained first, then `bytes` is copied in if it fits
    /// and nothing is queued ahead of it. Otherwise the overflow policy
    /// decides what happens to it.
    ///
    /// # Returns
    ///
    /// What happened to the payload, or [`BufferError::CapacityExceeded`] if
    /// it is larger than the buffer could ever hold.
    pub fn write(&self, bytes: &[u8]) -> Result<WriteOutcome> {
        let mut writer = self.writer.lock();
        let mut store = self.store.lock();

        // A growing ring is measured against its ceiling, not its current size
        let limit = Self::write_limit(&writer.policy, &store);
        if bytes.len() > limit {
            return Err(BufferError::CapacityExceeded {
                requested: bytes.len(),
                limit,
            });
        }
        if self.gate.is_closed() {
            return Ok(WriteOutcome::Closed);
        }
        if bytes.is_empty() {
            return Ok(WriteOutcome::Written);
        }

        let drained = self.drain_locked(&mut writer, &mut store);
        let outcome = self.write_locked(&mut writer, &mut store, bytes);
        drop(store);
        drop(writer);

        if drained > 0 || outcome == WriteOutcome::Written {
            self.gate.signal();
        }
        Ok(outcome)
    }

    /// Write `bytes`, waiting for space instead of applying the overflow policy
    ///
    /// Returns [`WriteOutcome::Closed`] if the buffer is or becomes closed
    /// before the bytes fit.
    pub fn write_blocking(&self, bytes: &[u8]) -> Result<WriteOutcome> {
        loop {
            let mut writer = self.writer.lock();
            let mut store = self.store.lock();

            let limit = store.capacity() - 1;
            if bytes.len() > limit {
                return Err(BufferError::CapacityExceeded {
                    requested: bytes.len(),
                    limit,
                });
            }
            if self.gate.is_closed() {
                return Ok(WriteOutcome::Closed);
            }

            self.drain_locked(&mut writer, &mut store);
            if !writer.policy.has_backlog() && bytes.len() <= store.write_available() {
                store.write(bytes);
                writer.episode.settle();
                drop(store);
                drop(writer);
                self.gate.signal();
                return Ok(WriteOutcome::Written);
            }

            // Wait holding only the store lock; the writer side must stay
            // free for write(), clear() and the reader's queue drain
            drop(writer);
            match self.gate.wait_for_space(&mut store) {
                Wake::Ready => continue,
                Wake::Closed => return Ok(WriteOutcome::Closed),
                Wake::Interrupted => return Err(BufferError::Interrupted),
            }
        }
    }

    /// Read up to `max_len` bytes, blocking while nothing is readable
    ///
    /// An empty vector means the buffer is closed and fully drained.
    pub fn read(&self, max_len: usize) -> Result<Vec<u8>> {
        if max_len == 0 {
            return Ok(Vec::new());
        }
        let bytes = match self.wait_readable(max_len, false)? {
            Some(mut store) => store.read(max_len),
            None => return Ok(Vec::new()),
        };
        self.after_read();
        Ok(bytes)
    }

    /// Read into `out`, blocking while nothing is readable
    ///
    /// # Returns
    ///
    /// The number of bytes copied; `0` means the buffer is closed and fully
    /// drained.
    pub fn read_into(&self, out: &mut [u8]) -> Result<usize> {
        self.read_into_checked(out, false)
    }

    /// Like [`read_into`](Self::read_into), but an `out` larger than the ring
    /// is filled partially instead of rejected
    ///
    /// The capacity is read under the same lock as the copy, so a concurrent
    /// [`clear`](Self::clear) shrinking a grown ring cannot fail the call.
    pub(crate) fn read_into_clamped(&self, out: &mut [u8]) -> Result<usize> {
        self.read_into_checked(out, true)
    }

    fn read_into_checked(&self, out: &mut [u8], clamp: bool) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        let n = match self.wait_readable(out.len(), clamp)? {
            Some(mut store) => store.read_into(out),
            None => return Ok(0),
        };
        self.after_read();
        Ok(n)
    }

    /// Move the read cursor
    ///
    /// # Returns
    ///
    /// The new absolute read position, or the readable byte count for
    /// [`SeekOrigin::Size`]. The cursor is unchanged on error.
    pub fn seek(&self, origin: SeekOrigin, offset: i64) -> Result<u64> {
        let mut store = self.store.lock();
        let position = seek::seek(&mut store, origin, offset)?;
        drop(store);

        // Seeking backwards reduces free space; seeking forward frees it
        self.gate.signal();
        Ok(position)
    }

    /// Seek with a decoder whence value
    ///
    /// Returns `-1` on any failure, which is what demuxer I/O callbacks
    /// expect.
    pub fn seek_whence(&self, whence: i32, offset: i64) -> i64 {
        let origin = match SeekOrigin::from_whence(whence) {
            Ok(origin) => origin,
            Err(err) => {
                warn!(whence, offset, %err, "unsupported seek");
                return -1;
            }
        };

        match self.seek(origin, offset) {
            Ok(position) => i64::try_from(position).unwrap_or(-1),
            Err(_) => -1,
        }
    }

    /// Copy retained bytes starting at `absolute` without consuming them
    ///
    /// # Arguments
    ///
    /// * `absolute` - Absolute stream position in the retained window
    /// * `out` - Destination buffer
    ///
    /// # Returns
    ///
    /// The number of bytes copied, at most the bytes written after `absolute`.
    pub fn peek(&self, absolute: u64, out: &mut [u8]) -> Result<usize> {
        Ok(self.store.lock().peek(absolute, out)?)
    }

    /// Drain spilled bytes into the ring now
    ///
    /// Returns `true` if any bytes were recovered.
    pub fn process_queue(&self) -> bool {
        let mut writer = self.writer.lock();
        let mut store = self.store.lock();
        let drained = self.drain_locked(&mut writer, &mut store);
        drop(store);
        drop(writer);

        if drained > 0 {
            self.gate.signal();
        }
        drained > 0
    }

    /// Reset the buffer for a new stream
    ///
    /// Discards all content and queued bytes, zeroes the counters, returns a
    /// grown ring to its starting capacity and reopens a closed buffer.
    pub fn clear(&self) {
        let mut writer = self.writer.lock();
        let mut store = self.store.lock();

        store.reset(self.min_capacity);
        if let Some(queue) = writer.policy.queue_mut() {
            queue.clear();
        }
        writer.episode = OverflowEpisode::default();
        self.stats.reset();
        self.gate.reopen();

        debug!(capacity = self.min_capacity, "cleared ring buffer");
        drop(store);
        self.gate.signal();
    }

    /// Stop accepting writes and wake blocked callers
    ///
    /// Buffered bytes stay readable; once they are drained reads return end
    /// of stream.
    pub fn close(&self) {
        let store = self.store.lock();
        self.gate.close();
        debug!(unread = store.read_available(), "closed ring buffer");
    }

    /// Wake a blocked reader or writer with [`BufferError::Interrupted`]
    ///
    /// If nobody is blocked, the next call that has to block is interrupted
    /// instead.
    pub fn interrupt(&self) {
        let _store = self.store.lock();
        self.gate.interrupt();
    }

    /// True once [`close`](Self::close) has been called and not undone by
    /// [`clear`](Self::clear)
    pub fn is_closed(&self) -> bool {
        self.gate.is_closed()
    }

    /// Bytes that can be read without blocking
    pub fn read_available(&self) -> usize {
        self.store.lock().read_available()
    }

    /// Bytes that can be written without overflowing
    pub fn write_available(&self) -> usize {
        self.store.lock().write_available()
    }

    /// Absolute write position
    pub fn total_bytes_written(&self) -> u64 {
        self.store.lock().write_position()
    }

    /// Absolute read position
    pub fn total_bytes_read(&self) -> u64 {
        self.store.lock().read_position()
    }

    /// Current ring capacity
    pub fn capacity(&self) -> usize {
        self.store.lock().capacity()
    }

    /// Capacity the buffer started with
    pub fn min_capacity(&self) -> usize {
        self.min_capacity
    }

    /// Largest capacity the buffer may grow to
    pub fn max_capacity(&self) -> usize {
        match &self.writer.lock().policy {
            OverflowPolicy::Grow(growth) => growth.max_capacity,
            _ => self.min_capacity,
        }
    }

    /// Snapshot of the loss, spill and growth counters
    pub fn stats(&self) -> BufferStats {
        self.stats.snapshot()
    }

    fn write_limit(policy: &OverflowPolicy, store: &RingStore) -> usize {
        match policy {
            OverflowPolicy::Grow(growth) => growth.max_capacity.max(store.capacity()) - 1,
            _ => store.capacity() - 1,
        }
    }

    fn write_locked(
        &self,
        writer: &mut WriteSide,
        store: &mut RingStore,
        bytes: &[u8],
    ) -> WriteOutcome {
        let WriteSide { policy, episode } = writer;

        if !policy.has_backlog() && bytes.len() <= store.write_available() {
            store.write(bytes);
            episode.settle();
            return WriteOutcome::Written;
        }

        match policy {
            OverflowPolicy::Drop => self.drop_payload(episode, bytes.len(), 0),
            OverflowPolicy::Spill(queue) => self.spill(queue, episode, store.capacity(), bytes),
            OverflowPolicy::Grow(growth) => {
                let unread = store.read_available();
                let target = growth.target_capacity(store.capacity(), bytes.len(), unread);
                if let Some(target) = target {
                    let from = store.capacity();
                    store.regrow(target);
                    self.stats.record_growth();
                    warn!(from, to = target, unread, "expanded ring buffer");

                    // Queued chunks go into the new space first; the payload
                    // only lands directly if nothing is left ahead of it
                    let mut backlog = false;
                    if let Some(queue) = growth.fallback_queue.as_mut() {
                        let moved = queue.drain_into(store);
                        if moved > 0 {
                            self.stats.record_drained(moved);
                            episode.recovered(moved);
                        }
                        backlog = !queue.is_empty();
                    }
                    if !backlog && bytes.len() <= store.write_available() {
                        store.write(bytes);
                        episode.settle();
                        info!(capacity = target, "resumed writing after expansion");
                        return WriteOutcome::Written;
                    }
                }

                // At the ceiling, or still behind a backlog
                match growth.fallback_queue.as_mut() {
                    Some(queue) => self.spill(queue, episode, store.capacity(), bytes),
                    None => self.drop_payload(episode, bytes.len(), 0),
                }
            }
        }
    }

    fn spill(
        &self,
        queue: &mut OverflowQueue,
        episode: &mut OverflowEpisode,
        capacity: usize,
        bytes: &[u8],
    ) -> WriteOutcome {
        if queue.push(bytes) {
            self.stats.record_spilled(bytes.len());
            episode.spilled(bytes.len(), capacity);
            WriteOutcome::Spilled
        } else {
            self.drop_payload(episode, bytes.len(), queue.queued_bytes())
        }
    }

    fn drop_payload(
        &self,
        episode: &mut OverflowEpisode,
        len: usize,
        queued: usize,
    ) -> WriteOutcome {
        self.stats.record_lost(len);
        episode.dropped(len, queued);
        WriteOutcome::Dropped
    }

    fn drain_locked(&self, writer: &mut WriteSide, store: &mut RingStore) -> usize {
        let WriteSide { policy, episode } = writer;
        let Some(queue) = policy.queue_mut() else {
            return 0;
        };
        if queue.is_empty() {
            return 0;
        }

        // Stops at the first chunk that does not fit, keeping FIFO order
        let moved = queue.drain_into(store);
        if moved > 0 {
            self.stats.record_drained(moved);
            episode.recovered(moved);
        }
        if queue.is_empty() {
            episode.settle();
        }
        moved
    }

    /// Block until bytes are readable, returning the locked store
    ///
    /// `None` means the buffer is closed and empty. With `clamp` set, a `len`
    /// above the capacity is accepted; the copy is bounded by what is readable.
    fn wait_readable(
        &self,
        len: usize,
        clamp: bool,
    ) -> Result<Option<MutexGuard<'_, RingStore>>> {
        loop {
            let mut store = self.store.lock();
            if !clamp && len > store.capacity() {
                return Err(BufferError::CapacityExceeded {
                    requested: len,
                    limit: store.capacity(),
                });
            }

            let wake = self
                .gate
                .wait_for_data(&mut store, |store| !store.is_empty() || self.stats.queued() > 0);
            match wake {
                Wake::Ready if store.is_empty() => {
                    // Only spilled bytes are left. Drain them without the
                    // store lock held, then wait again in case another
                    // producer got there first
                    drop(store);
                    self.process_queue();
                }
                Wake::Ready => return Ok(Some(store)),
                Wake::Closed => return Ok(None),
                Wake::Interrupted => return Err(BufferError::Interrupted),
            }
        }
    }

    fn after_read(&self) {
        self.gate.signal();

        if self.stats.queued() == 0 {
            return;
        }
        // A writer holding its lock drains on its own
        if let Some(mut writer) = self.writer.try_lock() {
            let mut store = self.store.lock();
            let drained = self.drain_locked(&mut writer, &mut store);
            drop(store);
            drop(writer);
            if drained > 0 {
                self.gate.signal();
            }
        }
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::build(&BufferConfig::default())
    }
}
