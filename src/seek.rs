//! Origin-relative seeking over the retained window
//!
//! Decoders address the stream the way they address a file: from the start,
//! from the current position, or from the end. This module turns such a
//! request into an absolute position and moves the read cursor there, or
//! leaves it alone if the target has already been overwritten or not yet
//! written.

use tracing::{debug, warn};

use crate::error::{BufferError, SeekError};
use crate::ring::store::RingStore;

/// Whence value asking for the stream size instead of a move
pub const WHENCE_SIZE: i32 = 0x10000;

/// Whence flag asking the callee to seek even if it is expensive
pub const WHENCE_FORCE: i32 = 0x20000;

/// Reference point of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// Absolute stream position
    Start,
    /// Relative to the current read position
    Current,
    /// Relative to the current write position
    End,
    /// Report the readable byte count without moving
    Size,
}

impl SeekOrigin {
    /// Map a decoder whence value
    ///
    /// The force flag is ignored. Anything other than the three classic
    /// whence values and the size query is rejected.
    pub fn from_whence(whence: i32) -> Result<Self, BufferError> {
        match whence & !WHENCE_FORCE {
            0 => Ok(SeekOrigin::Start),
            1 => Ok(SeekOrigin::Current),
            2 => Ok(SeekOrigin::End),
            WHENCE_SIZE => Ok(SeekOrigin::Size),
            _ => Err(BufferError::UnsupportedWhence(whence)),
        }
    }
}

/// Candidate absolute position for a move
///
/// Computed in `i128` so that negative and overflowing targets survive until
/// validation. Returns `None` for [`SeekOrigin::Size`].
pub fn target(store: &RingStore, origin: SeekOrigin, offset: i64) -> Option<i128> {
    let base = match origin {
        SeekOrigin::Start => 0,
        SeekOrigin::Current => store.read_position(),
        SeekOrigin::End => store.write_position(),
        SeekOrigin::Size => return None,
    };
    Some(base as i128 + offset as i128)
}

/// Apply a seek to `store`
///
/// # Arguments
///
/// * `store` - Ring whose read cursor moves
/// * `origin` - Reference point
/// * `offset` - Signed distance from the reference point
///
/// # Returns
///
/// The new absolute read position, or for [`SeekOrigin::Size`] the number of
/// readable bytes. On error the cursor is unchanged.
pub fn seek(store: &mut RingStore, origin: SeekOrigin, offset: i64) -> Result<u64, SeekError> {
    let Some(target) = target(store, origin, offset) else {
        return Ok(store.read_available() as u64);
    };

    let result = store
        .check_window(target)
        .and_then(|absolute| store.set_read_position(absolute));

    match &result {
        Ok(position) => debug!(?origin, offset, position, "seek"),
        Err(err) => warn!(?origin, offset, %err, "rejected seek"),
    }
    result
}
