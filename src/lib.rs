//! Tuner Ring Buffer - a seekable concurrent byte ring between network tuner
//! producers and stream consumers.
//!
//! # Overview
//!
//! A tuner delivers a transport stream at line rate from a receive thread,
//! while a consumer (a recorder, a remuxer, a decoder) drains it at its own
//! pace and occasionally seeks backwards to re-probe the stream. This crate
//! provides the buffer in between:
//!
//! 1. [`RingBuffer`]: fixed-capacity ring with absolute stream positions,
//!    origin-relative seeking, and a per-instance overflow policy
//! 2. [`TransferBuffer`]: compacting linear buffer that only wakes its reader
//!    once a minimum transfer size has accumulated
//!
//! # Key Features
//!
//! - Non-blocking writes that drop, spill to a queue, or grow the ring when full
//! - Blocking reads that return end of stream once the buffer is closed
//! - Seeks from start, current position or end, validated against the
//!   retained window
//! - Decoder whence bridge returning `-1` on failure
//! - Loss and spill counters exposed through [`BufferStats`]
//! - `std::io` `Read`, `Write` and `Seek` on `&RingBuffer`
//!
//! # Usage
//!
//! ```
//! use tuner_ring_buffer::{BufferConfig, RingBuffer, SeekOrigin, WriteOutcome};
//!
//! let buffer = RingBuffer::with_config(BufferConfig::spilling(1024)).unwrap();
//! assert_eq!(buffer.write(b"packet").unwrap(), WriteOutcome::Written);
//!
//! assert_eq!(buffer.read(64).unwrap(), b"packet");
//! assert_eq!(buffer.seek(SeekOrigin::Current, -6).unwrap(), 0);
//! assert_eq!(buffer.read(3).unwrap(), b"pac");
//! ```
//!
//! The library logs through `tracing` and never installs a subscriber.
//! See the `demos` directory for a producer/consumer relay.

#![deny(missing_docs)]

mod buffer;
mod config;
mod error;
mod io;
mod overflow;
pub mod ring;
pub mod seek;
mod transfer;

pub use buffer::RingBuffer;
pub use config::{
    BufferConfig, ConfigError, GrowthFallback, OverflowMode, DEFAULT_CAPACITY,
    DEFAULT_MIN_TRANSFER_SIZE, DEFAULT_TRANSFER_CAPACITY,
};
pub use error::{BufferError, Result, SeekError};
pub use overflow::{BufferStats, WriteOutcome};
pub use ring::store::RingStore;
pub use seek::SeekOrigin;
pub use transfer::TransferBuffer;

/// Overflow policy internals, for callers driving a [`RingStore`] directly
pub mod policy {
    pub use crate::overflow::{GrowthState, OverflowEpisode, OverflowPolicy, OverflowQueue};
}
