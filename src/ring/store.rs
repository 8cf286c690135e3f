//! Fixed-capacity byte storage with wrap-aware cursors
//!
//! `RingStore` holds no locks and applies no overflow policy. Callers are
//! expected to guard it with a mutex and to check `write_available` before
//! writing, exactly as [`RingBuffer`](crate::RingBuffer) does.

use std::fmt;

use super::Cursor;
use crate::error::SeekError;

/// Backing storage plus read and write cursors
///
/// One slot is always left unwritten so that equal cursors mean "empty".
/// Cursors are additionally tracked with pass counters, which gives every byte
/// an absolute position:
///
/// ```text
/// absolute = origin + passes * capacity + index
/// ```
///
/// `origin` is zero until the store is regrown, at which point it becomes the
/// absolute position of the first byte carried into the new storage.
pub struct RingStore {
    storage: Box<[u8]>,
    write: Cursor,
    read: Cursor,
    origin: u64,
}

impl RingStore {
    /// Create a zeroed store
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`. Use [`BufferConfig::validate`](crate::BufferConfig::validate)
    /// to reject such values up front.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring capacity must be at least 2 bytes");
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            write: Cursor::default(),
            read: Cursor::default(),
            origin: 0,
        }
    }

    /// Size of the backing storage
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Current write cursor
    pub fn write_cursor(&self) -> Cursor {
        self.write
    }

    /// Current read cursor
    pub fn read_cursor(&self) -> Cursor {
        self.read
    }

    /// Absolute position of the next byte to be written
    #[inline]
    pub fn write_position(&self) -> u64 {
        self.write.absolute(self.capacity(), self.origin)
    }

    /// Absolute position of the next byte to be read
    #[inline]
    pub fn read_position(&self) -> u64 {
        self.read.absolute(self.capacity(), self.origin)
    }

    /// Oldest absolute position whose byte is still in storage
    pub fn oldest_retained(&self) -> u64 {
        self.write_position()
            .saturating_sub(self.capacity() as u64)
            .max(self.origin)
    }

    /// Bytes between the read and write cursors
    ///
    /// This equals the physical index distance whenever the reader is less
    /// than a lap behind, and is `capacity` right after a seek to the oldest
    /// retained byte.
    #[inline]
    pub fn read_available(&self) -> usize {
        (self.write_position() - self.read_position()) as usize
    }

    /// Bytes that can be written without overrunning unread data
    #[inline]
    pub fn write_available(&self) -> usize {
        (self.capacity() - 1).saturating_sub(self.read_available())
    }

    /// True if there is nothing to read
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read_available() == 0
    }

    /// Copy `bytes` in at the write cursor
    ///
    /// # Panics
    ///
    /// Panics if `bytes.len() > write_available()`.
    pub fn write(&mut self, bytes: &[u8]) {
        assert!(
            bytes.len() <= self.write_available(),
            "write of {} bytes exceeds {} available",
            bytes.len(),
            self.write_available()
        );

        let (head, tail) = self.writable_slices(bytes.len());
        let split = head.len();
        head.copy_from_slice(&bytes[..split]);
        tail.copy_from_slice(&bytes[split..]);
        self.advance_write(bytes.len());
    }

    /// Read up to `max_len` bytes into a new vector
    pub fn read(&mut self, max_len: usize) -> Vec<u8> {
        let mut out = vec![0u8; max_len.min(self.read_available())];
        let n = self.read_into(&mut out);
        out.truncate(n);
        out
    }

    /// Read into `out`, returning the number of bytes copied
    pub fn read_into(&mut self, out: &mut [u8]) -> usize {
        let n = self.copy_from(self.read, out);
        self.advance_read(n);
        n
    }

    /// Copy retained bytes starting at `absolute` without moving the read cursor
    ///
    /// # Arguments
    ///
    /// * `absolute` - Position in `[oldest_retained, write_position)`
    /// * `out` - Destination; at most `write_position - absolute` bytes are copied
    ///
    /// # Returns
    ///
    /// The number of bytes copied, or the retained window if `absolute` is
    /// outside it.
    pub fn peek(&self, absolute: u64, out: &mut [u8]) -> Result<usize, SeekError> {
        let newest = self.write_position();
        if absolute >= newest {
            return Err(self.out_of_range(absolute as i128));
        }
        self.check_window(absolute as i128)?;

        let cursor = Cursor::from_absolute(absolute, self.capacity(), self.origin);
        let want = out.len().min((newest - absolute) as usize);
        Ok(self.copy_from(cursor, &mut out[..want]))
    }

    /// Validate `target` against the retained window
    pub fn check_window(&self, target: i128) -> Result<u64, SeekError> {
        if target < self.oldest_retained() as i128 || target > self.write_position() as i128 {
            return Err(self.out_of_range(target));
        }
        Ok(target as u64)
    }

    /// Move the read cursor to an absolute position
    ///
    /// The cursor is left untouched when `absolute` is outside the retained
    /// window.
    pub fn set_read_position(&mut self, absolute: u64) -> Result<u64, SeekError> {
        let absolute = self.check_window(absolute as i128)?;
        self.read = Cursor::from_absolute(absolute, self.capacity(), self.origin);
        Ok(absolute)
    }

    /// Consume `n` bytes without copying them out
    ///
    /// # Panics
    ///
    /// Panics if `n > read_available()`.
    pub fn advance_read(&mut self, n: usize) {
        assert!(n <= self.read_available(), "read cursor would pass the writer");
        let capacity = self.capacity();
        self.read.advance(n, capacity);
    }

    /// Commit `n` bytes previously placed through [`writable_slices`](Self::writable_slices)
    ///
    /// # Panics
    ///
    /// Panics if `n > write_available()`.
    pub fn advance_write(&mut self, n: usize) {
        assert!(n <= self.write_available(), "write cursor would overrun unread data");
        let capacity = self.capacity();
        self.write.advance(n, capacity);
    }

    /// Mutable storage for the next `len` bytes at the write cursor
    ///
    /// The second slice is non-empty when the span wraps past the end of
    /// storage. Nothing is committed until [`advance_write`](Self::advance_write).
    pub fn writable_slices(&mut self, len: usize) -> (&mut [u8], &mut [u8]) {
        let len = len.min(self.write_available());
        let start = self.write.index;
        let first = len.min(self.capacity() - start);
        let (front, back) = self.storage.split_at_mut(start);
        (&mut back[..first], &mut front[..len - first])
    }

    /// Unread bytes at the read cursor, split at the wrap point
    pub fn readable_slices(&self) -> (&[u8], &[u8]) {
        let len = self.read_available();
        let start = self.read.index;
        let first = len.min(self.capacity() - start);
        (&self.storage[start..start + first], &self.storage[..len - first])
    }

    /// Move unread content into a larger allocation
    ///
    /// Content is laid out from index 0 starting at the read cursor, so bytes
    /// the reader already consumed are released. Absolute positions are
    /// preserved through `origin`.
    ///
    /// # Panics
    ///
    /// Panics if `new_capacity` is not larger than the current capacity.
    pub fn regrow(&mut self, new_capacity: usize) {
        assert!(
            new_capacity > self.capacity(),
            "regrow must enlarge the store ({} -> {})",
            self.capacity(),
            new_capacity
        );

        let read_position = self.read_position();
        let len = self.read_available();
        let mut storage = vec![0u8; new_capacity].into_boxed_slice();
        self.copy_from(self.read, &mut storage[..len]);

        self.storage = storage;
        self.origin = read_position;
        self.read = Cursor::default();
        self.write = Cursor::new(len, 0);
    }

    /// Drop all content and restart positions at zero
    ///
    /// A store of a different capacity is reallocated; otherwise the existing
    /// storage is reused.
    pub fn reset(&mut self, capacity: usize) {
        if capacity != self.capacity() {
            *self = Self::new(capacity);
        } else {
            self.write = Cursor::default();
            self.read = Cursor::default();
            self.origin = 0;
        }
    }

    fn copy_from(&self, cursor: Cursor, out: &mut [u8]) -> usize {
        let start = cursor.index;
        let n = out.len();
        let first = n.min(self.capacity() - start);
        out[..first].copy_from_slice(&self.storage[start..start + first]);
        out[first..n].copy_from_slice(&self.storage[..n - first]);
        n
    }

    fn out_of_range(&self, target: i128) -> SeekError {
        SeekError {
            target,
            oldest: self.oldest_retained(),
            newest: self.write_position(),
        }
    }
}

impl fmt::Debug for RingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingStore")
            .field("capacity", &self.capacity())
            .field("write", &self.write)
            .field("read", &self.read)
            .field("origin", &self.origin)
            .finish()
    }
}
