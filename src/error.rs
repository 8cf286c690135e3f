//! Error types for ring buffer operations
//!
//! Only programming errors and caller-visible conditions are errors here.
//! Overflow and data loss are reported through
//! [`WriteOutcome`](crate::WriteOutcome) and [`BufferStats`](crate::BufferStats),
//! never as an `Err`.

use std::io;

/// A seek target that falls outside the retained window
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("seek target {target} is outside the retained window [{oldest}, {newest}]")]
pub struct SeekError {
    /// Requested absolute position (may be negative when an offset underflows)
    pub target: i128,
    /// Oldest absolute position still retained in storage
    pub oldest: u64,
    /// Current absolute write position
    pub newest: u64,
}

/// Errors returned by ring buffer operations
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// A single request was larger than the buffer can ever hold
    #[error("request of {requested} bytes exceeds the buffer limit of {limit} bytes")]
    CapacityExceeded {
        /// Length of the rejected request
        requested: usize,
        /// Largest length the buffer accepts for this operation
        limit: usize,
    },
    /// The requested read position is not retained
    #[error(transparent)]
    SeekOutOfRange(#[from] SeekError),
    /// A blocked call was woken by [`interrupt`](crate::RingBuffer::interrupt)
    #[error("blocked buffer operation was interrupted")]
    Interrupted,
    /// A decoder whence value with no mapping
    #[error("unsupported seek whence {0}")]
    UnsupportedWhence(i32),
}

/// Result type for ring buffer operations
pub type Result<T> = std::result::Result<T, BufferError>;

impl From<BufferError> for io::Error {
    fn from(error: BufferError) -> Self {
        let kind = match &error {
            BufferError::CapacityExceeded { .. } => io::ErrorKind::InvalidInput,
            BufferError::SeekOutOfRange(_) | BufferError::UnsupportedWhence(_) => {
                io::ErrorKind::InvalidInput
            }
            BufferError::Interrupted => io::ErrorKind::Interrupted,
        };
        io::Error::new(kind, error)
    }
}
