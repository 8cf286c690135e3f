//! `std::io` adapters
//!
//! The traits are implemented for `&RingBuffer` so a producer thread and a
//! consumer thread can each hold a reference and use the standard traits:
//!
//! ```no_run
//! use std::io::{Read, Write};
//! use tuner_ring_buffer::RingBuffer;
//!
//! let buffer = RingBuffer::new(64 * 1024);
//! (&buffer).write_all(b"\x47\x40\x11\x10").unwrap();
//!
//! let mut packet = [0u8; 4];
//! (&buffer).read_exact(&mut packet).unwrap();
//! ```

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::buffer::RingBuffer;
use crate::overflow::WriteOutcome;
use crate::seek::SeekOrigin;

impl Read for &RingBuffer {
    /// Blocks while nothing is readable; `Ok(0)` is end of stream
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into_clamped(buf)?)
    }
}

impl Write for &RingBuffer {
    /// Never blocks
    ///
    /// Bytes the overflow policy drops still count as written. Writing to a
    /// closed buffer fails with [`io::ErrorKind::BrokenPipe`].
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len().min(self.capacity() - 1);
        match RingBuffer::write(self, &buf[..len])? {
            WriteOutcome::Closed => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "ring buffer is closed",
            )),
            WriteOutcome::Written | WriteOutcome::Spilled | WriteOutcome::Dropped => Ok(len),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for &RingBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (origin, offset) = match pos {
            SeekFrom::Start(position) => {
                let offset = i64::try_from(position).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek position overflows i64")
                })?;
                (SeekOrigin::Start, offset)
            }
            SeekFrom::Current(offset) => (SeekOrigin::Current, offset),
            SeekFrom::End(offset) => (SeekOrigin::End, offset),
        };
        Ok(RingBuffer::seek(self, origin, offset)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_traits() {
        let buffer = RingBuffer::new(8);
        let mut writer = &buffer;
        assert_eq!(Write::write(&mut writer, &[1; 20]).unwrap(), 7);

        let mut reader = &buffer;
        let mut out = [0u8; 20];
        assert_eq!(Read::read(&mut reader, &mut out).unwrap(), 7);

        buffer.close();
        assert_eq!(Read::read(&mut reader, &mut out).unwrap(), 0);
        assert_eq!(
            Write::write(&mut writer, &[1]).unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
    }

    #[test]
    fn test_seek_trait() {
        let buffer = RingBuffer::new(16);
        (&buffer).write_all(&[0, 1, 2, 3, 4, 5]).unwrap();

        let mut handle = &buffer;
        assert_eq!(Seek::seek(&mut handle, SeekFrom::End(-2)).unwrap(), 4);
        assert_eq!(handle.stream_position().unwrap(), 4);
        assert_eq!(
            Seek::seek(&mut handle, SeekFrom::Current(10)).unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );

        let mut out = [0u8; 2];
        handle.read_exact(&mut out).unwrap();
        assert_eq!(out, [4, 5]);
    }

    #[test]
    fn test_read_clamps_after_shrink() {
        use crate::config::BufferConfig;
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let buffer = Arc::new(RingBuffer::with_config(BufferConfig::growing(16)).unwrap());
        buffer.write(&[1; 20]).unwrap();
        assert_eq!(buffer.capacity(), 32);
        assert_eq!(buffer.read(32).unwrap(), vec![1; 20]);

        // Sized for the grown ring, then parked on an empty buffer
        let reader = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut out = [0u8; 32];
                let n = Read::read(&mut &*buffer, &mut out).unwrap();
                out[..n].to_vec()
            })
        };

        thread::sleep(Duration::from_millis(20));
        buffer.clear();
        assert_eq!(buffer.capacity(), 16);
        buffer.write(&[2; 5]).unwrap();
        assert_eq!(reader.join().unwrap(), vec![2; 5]);

        // Larger than the ring from the start
        buffer.write(&[3; 15]).unwrap();
        let mut out = [0u8; 64];
        assert_eq!(Read::read(&mut &*buffer, &mut out).unwrap(), 15);
    }
}
