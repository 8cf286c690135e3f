//! Overflow handling for writes that do not fit in the ring
//!
//! A buffer resolves overflow with one of three policies:
//!
//! - Drop: discard the payload and count it as lost
//! - Spill: park the payload in an [`OverflowQueue`] and drain it back in order
//! - Grow: reallocate a larger ring up to a ceiling, then drop or spill
//!
//! Loss is logged once per overflow episode. An episode ends when the ring
//! accepts writes directly again, at which point a single recovery line
//! reports what was recovered and what was lost.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;
use tracing::{info, warn};

use crate::config::{BufferConfig, GrowthFallback, OverflowMode};
use crate::ring::store::RingStore;

/// What happened to a payload passed to [`RingBuffer::write`](crate::RingBuffer::write)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Copied into the ring
    Written,
    /// Queued outside the ring, to be drained in order
    Spilled,
    /// Discarded and counted as lost
    Dropped,
    /// Ignored because the buffer is closed
    Closed,
}

/// FIFO of payloads that did not fit, bounded by a byte budget
#[derive(Debug)]
pub struct OverflowQueue {
    chunks: VecDeque<Vec<u8>>,
    queued_bytes: usize,
    max_bytes: usize,
}

impl OverflowQueue {
    /// Create an empty queue
    pub fn new(max_bytes: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            queued_bytes: 0,
            max_bytes,
        }
    }

    /// Append a copy of `bytes` if it fits within the budget
    pub fn push(&mut self, bytes: &[u8]) -> bool {
        if self.queued_bytes + bytes.len() > self.max_bytes {
            return false;
        }
        self.chunks.push_back(bytes.to_vec());
        self.queued_bytes += bytes.len();
        true
    }

    /// Move whole chunks from the front into `store` while they fit
    ///
    /// Stops at the first chunk that does not fit, leaving it at the front so
    /// ordering is preserved. Returns the number of bytes moved.
    pub fn drain_into(&mut self, store: &mut RingStore) -> usize {
        let mut moved = 0;
        while let Some(front) = self.chunks.front() {
            if front.len() > store.write_available() {
                break;
            }
            store.write(front);
            moved += front.len();
            self.chunks.pop_front();
        }
        self.queued_bytes -= moved;
        moved
    }

    /// Bytes currently queued
    #[inline]
    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes
    }

    /// Number of queued chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True if nothing is queued
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Discard everything queued
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.queued_bytes = 0;
    }
}

/// Sizing state of a growable ring
#[derive(Debug)]
pub struct GrowthState {
    /// Capacity the ring started with and returns to on clear
    pub min_capacity: usize,
    /// Ceiling the ring never grows past
    pub max_capacity: usize,
    /// Bytes added per step
    pub increment: usize,
    /// Queue used once the ceiling is reached, if the fallback is spilling
    pub fallback_queue: Option<OverflowQueue>,
}

impl GrowthState {
    /// Capacity to grow to so that `needed` more bytes fit
    ///
    /// Steps by `increment` until the write fits or the ceiling is reached.
    /// Returns `None` when the ring is already at its ceiling.
    pub fn target_capacity(&self, current: usize, needed: usize, unread: usize) -> Option<usize> {
        if current >= self.max_capacity {
            return None;
        }

        let mut target = current;
        loop {
            target = target.saturating_add(self.increment).min(self.max_capacity);
            if target - 1 - unread >= needed || target == self.max_capacity {
                return Some(target);
            }
        }
    }
}

/// Overflow behavior of one buffer instance
#[derive(Debug)]
pub enum OverflowPolicy {
    /// Discard what does not fit
    Drop,
    /// Queue what does not fit
    Spill(OverflowQueue),
    /// Grow the ring, then fall back
    Grow(GrowthState),
}

impl OverflowPolicy {
    /// Build the runtime policy for a configuration
    pub fn from_config(config: &BufferConfig) -> Self {
        match config.policy {
            OverflowMode::Drop => OverflowPolicy::Drop,
            OverflowMode::Spill => {
                OverflowPolicy::Spill(OverflowQueue::new(config.max_overflow_bytes))
            }
            OverflowMode::Grow { fallback } => OverflowPolicy::Grow(GrowthState {
                min_capacity: config.capacity,
                max_capacity: config.max_capacity,
                increment: config.growth_increment,
                fallback_queue: match fallback {
                    GrowthFallback::Drop => None,
                    GrowthFallback::Spill => Some(OverflowQueue::new(config.max_overflow_bytes)),
                },
            }),
        }
    }

    /// The spill queue, if this policy has one
    pub fn queue(&self) -> Option<&OverflowQueue> {
        match self {
            OverflowPolicy::Drop => None,
            OverflowPolicy::Spill(queue) => Some(queue),
            OverflowPolicy::Grow(growth) => growth.fallback_queue.as_ref(),
        }
    }

    /// Mutable access to the spill queue, if this policy has one
    pub fn queue_mut(&mut self) -> Option<&mut OverflowQueue> {
        match self {
            OverflowPolicy::Drop => None,
            OverflowPolicy::Spill(queue) => Some(queue),
            OverflowPolicy::Grow(growth) => growth.fallback_queue.as_mut(),
        }
    }

    /// True if spilled bytes are waiting to be drained
    pub fn has_backlog(&self) -> bool {
        self.queue().is_some_and(|queue| !queue.is_empty())
    }
}

/// Edge-triggered logging state for one overflow episode
#[derive(Debug, Default)]
pub struct OverflowEpisode {
    spilling: bool,
    dropping: bool,
    recovered: u64,
    lost: u64,
}

impl OverflowEpisode {
    /// Record a payload parked in the spill queue
    pub fn spilled(&mut self, len: usize, capacity: usize) {
        if !self.spilling {
            self.spilling = true;
            warn!(bytes = len, capacity, "ring is full, queueing overflow");
        }
    }

    /// Record a discarded payload
    pub fn dropped(&mut self, len: usize, queued: usize) {
        self.lost += len as u64;
        if !self.dropping {
            self.dropping = true;
            warn!(bytes = len, queued, "no room for write, dropping bytes");
        }
    }

    /// Record queued bytes that made it into the ring
    pub fn recovered(&mut self, len: usize) {
        self.recovered += len as u64;
    }

    /// Close the episode once the ring accepts writes directly again
    pub fn settle(&mut self) {
        if self.spilling || self.dropping {
            info!(
                recovered = self.recovered,
                lost = self.lost,
                "overflow cleared"
            );
        }
        *self = Self::default();
    }

    /// True while an episode is open
    pub fn is_active(&self) -> bool {
        self.spilling || self.dropping
    }
}

/// Snapshot of a buffer's overflow counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Bytes discarded since construction or the last clear
    pub bytes_lost: u64,
    /// Bytes currently parked in the spill queue
    pub bytes_queued: u64,
    /// Bytes ever routed through the spill queue
    pub bytes_spilled: u64,
    /// Number of times the ring was reallocated larger
    pub growth_count: u64,
}

/// Live overflow counters, updated by writers and read without locks
#[derive(Debug, Default)]
pub struct OverflowStats {
    bytes_lost: CachePadded<AtomicU64>,
    bytes_queued: CachePadded<AtomicU64>,
    bytes_spilled: CachePadded<AtomicU64>,
    growth_count: CachePadded<AtomicU64>,
}

impl OverflowStats {
    /// Count discarded bytes
    pub fn record_lost(&self, len: usize) {
        self.bytes_lost.fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Count bytes entering the spill queue
    pub fn record_spilled(&self, len: usize) {
        self.bytes_spilled.fetch_add(len as u64, Ordering::Relaxed);
        self.bytes_queued.fetch_add(len as u64, Ordering::Release);
    }

    /// Count bytes leaving the spill queue for the ring
    pub fn record_drained(&self, len: usize) {
        self.bytes_queued.fetch_sub(len as u64, Ordering::Release);
    }

    /// Count one reallocation
    pub fn record_growth(&self) {
        self.growth_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Bytes currently parked in the spill queue
    #[inline]
    pub fn queued(&self) -> u64 {
        self.bytes_queued.load(Ordering::Acquire)
    }

    /// Zero every counter
    pub fn reset(&self) {
        self.bytes_lost.store(0, Ordering::Relaxed);
        self.bytes_queued.store(0, Ordering::Release);
        self.bytes_spilled.store(0, Ordering::Relaxed);
        self.growth_count.store(0, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> BufferStats {
        BufferStats {
            bytes_lost: self.bytes_lost.load(Ordering::Relaxed),
            bytes_queued: self.queued(),
            bytes_spilled: self.bytes_spilled.load(Ordering::Relaxed),
            growth_count: self.growth_count.load(Ordering::Relaxed),
        }
    }
}
