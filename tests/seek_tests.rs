//! Seeking, peeking and the decoder whence bridge

use std::io::{Read, Seek, SeekFrom};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tuner_ring_buffer::seek::{WHENCE_FORCE, WHENCE_SIZE};
use tuner_ring_buffer::{BufferConfig, BufferError, RingBuffer, SeekOrigin};

fn stream_bytes(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(len as u64);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

/// Write `data` through a ring of `capacity`, consuming as it goes
fn filled_buffer(capacity: usize, data: &[u8]) -> RingBuffer {
    let buffer = RingBuffer::with_config(BufferConfig::dropping(capacity)).unwrap();
    for chunk in data.chunks(capacity / 4) {
        buffer.write(chunk).unwrap();
        buffer.read(chunk.len()).unwrap();
    }
    buffer
}

/// Test the edges of the retained window
#[test]
fn test_seek_bounds() {
    let data = stream_bytes(2500);
    let buffer = filled_buffer(1000, &data);
    let write_abs = buffer.total_bytes_written() as i64;
    assert_eq!(write_abs, 2500);

    let err = buffer.seek(SeekOrigin::Start, write_abs + 1).unwrap_err();
    assert!(matches!(err, BufferError::SeekOutOfRange(_)));
    assert_eq!(buffer.total_bytes_read(), 2500, "Failed seek should leave the cursor");

    let err = buffer.seek(SeekOrigin::Start, write_abs - 1000 - 1).unwrap_err();
    match err {
        BufferError::SeekOutOfRange(seek) => {
            assert_eq!(seek.target, 1499);
            assert_eq!(seek.oldest, 1500);
            assert_eq!(seek.newest, 2500);
        }
        other => panic!("Unexpected error: {other}"),
    }

    assert_eq!(buffer.seek(SeekOrigin::Start, write_abs - 1000).unwrap(), 1500);
    assert_eq!(buffer.read_available(), 1000, "The whole ring should be readable again");
    assert_eq!(buffer.write_available(), 0);

    let mut replay = Vec::new();
    while replay.len() < 1000 {
        replay.extend(buffer.read(1000).unwrap());
    }
    assert_eq!(replay, &data[1500..], "Replay should match the retained bytes");
}

/// Test each origin against a known cursor state
#[test]
fn test_seek_origins() {
    let data = stream_bytes(3000);
    let buffer = RingBuffer::new(2048);
    buffer.write(&data[..1500]).unwrap();
    buffer.read(1000).unwrap();

    assert_eq!(buffer.seek(SeekOrigin::Current, 0).unwrap(), 1000);
    assert_eq!(buffer.seek(SeekOrigin::Current, -200).unwrap(), 800);
    assert_eq!(buffer.seek(SeekOrigin::End, 0).unwrap(), 1500);
    assert_eq!(buffer.read_available(), 0);
    assert_eq!(buffer.seek(SeekOrigin::End, -100).unwrap(), 1400);
    assert_eq!(buffer.seek(SeekOrigin::Size, 12345).unwrap(), 100);
    assert_eq!(buffer.total_bytes_read(), 1400, "Size query should not move");

    assert_eq!(buffer.read(100).unwrap(), &data[1400..1500]);
    assert!(buffer.seek(SeekOrigin::Current, 1).is_err());
    assert!(buffer.seek(SeekOrigin::Current, i64::MIN).is_err());
    assert!(buffer.seek(SeekOrigin::End, i64::MAX).is_err());
}

/// Test that peeking copies retained bytes without consuming them
#[test]
fn test_peek_window() {
    let data = stream_bytes(2500);
    let buffer = filled_buffer(1000, &data);

    // Spans the physical end of storage
    let mut out = vec![0u8; 600];
    assert_eq!(buffer.peek(1700, &mut out).unwrap(), 600);
    assert_eq!(out, &data[1700..2300]);

    let mut out = vec![0u8; 600];
    assert_eq!(buffer.peek(2200, &mut out).unwrap(), 300, "Peek stops at the writer");
    assert_eq!(&out[..300], &data[2200..]);

    assert!(buffer.peek(1499, &mut out).is_err());
    assert!(buffer.peek(2500, &mut out).is_err());
    assert_eq!(buffer.total_bytes_read(), 2500);
    assert_eq!(buffer.read_available(), 0);
}

/// Test that absolute positions survive a growth of the ring
#[test]
fn test_seek_after_growth() {
    let data = stream_bytes(700);
    let buffer = RingBuffer::with_config(BufferConfig::growing(256)).unwrap();

    buffer.write(&data[..200]).unwrap();
    buffer.read(150).unwrap();
    buffer.write(&data[200..450]).unwrap();
    assert_eq!(buffer.capacity(), 512);

    // Bytes before the read position were released by the growth
    assert!(buffer.seek(SeekOrigin::Start, 149).is_err());
    assert_eq!(buffer.seek(SeekOrigin::Start, 150).unwrap(), 150);
    assert_eq!(buffer.read(300).unwrap(), &data[150..450]);

    buffer.write(&data[450..700]).unwrap();
    assert_eq!(buffer.total_bytes_written(), 700);
    assert_eq!(buffer.seek(SeekOrigin::End, -400).unwrap(), 300);
    assert_eq!(buffer.read(400).unwrap(), &data[300..700]);
}

/// Test the whence mapping used by demuxer I/O callbacks
#[test]
fn test_seek_whence_values() {
    let data = stream_bytes(4000);
    let buffer = filled_buffer(2000, &data);

    assert_eq!(buffer.seek_whence(0, 3000), 3000);
    assert_eq!(buffer.seek_whence(1, -500), 2500);
    assert_eq!(buffer.seek_whence(1 | WHENCE_FORCE, 100), 2600);
    assert_eq!(buffer.seek_whence(2, -1000), 3000);
    assert_eq!(buffer.seek_whence(WHENCE_SIZE, 0), 1000);
    assert_eq!(buffer.seek_whence(WHENCE_SIZE | WHENCE_FORCE, 0), 1000);

    assert_eq!(buffer.seek_whence(0, 1999), -1, "Overwritten position");
    assert_eq!(buffer.seek_whence(2, 1), -1, "Unwritten position");
    assert_eq!(buffer.seek_whence(4, 0), -1, "Unknown whence");
    assert_eq!(buffer.total_bytes_read(), 3000, "Failures leave the cursor");
}

/// Test a decoder that mixes sequential reads with every kind of seek
#[test]
fn test_decoder_seek_pattern() {
    let capacity = 64 * 1024;
    let increment = 1184;
    let data = stream_bytes(capacity * 4);
    let buffer = RingBuffer::with_config(BufferConfig::dropping(capacity)).unwrap();

    let mut written = 0;
    let mut action = 0;
    let mut rejected = 0;
    while written < data.len() || buffer.read_available() > 0 {
        if written < data.len() {
            let n = increment.min(data.len() - written);
            if buffer.write_available() >= n {
                buffer.write(&data[written..written + n]).unwrap();
                written += n;
            }
        }

        let before = buffer.total_bytes_read() as i64;
        let inc = increment as i64;
        let result = match action % 7 {
            0 => buffer.seek_whence(0, before - inc * 3),
            1 => buffer.seek_whence(1, 0),
            2 => buffer.seek_whence(1, -inc),
            3 => buffer.seek_whence(2, -2 * inc),
            4 => {
                let size = buffer.seek_whence(WHENCE_SIZE, 0);
                assert_eq!(size, buffer.read_available() as i64);
                before
            }
            5 => buffer.seek_whence(2, 0),
            _ => before,
        };
        action += 1;

        if result < 0 {
            rejected += 1;
            assert_eq!(buffer.total_bytes_read() as i64, before);
        } else {
            assert_eq!(buffer.total_bytes_read() as i64, result);
        }

        let available = buffer.read_available();
        if available > 0 {
            let position = buffer.total_bytes_read() as usize;
            let chunk = buffer.read(increment.min(available)).unwrap();
            assert_eq!(
                chunk,
                &data[position..position + chunk.len()],
                "Bytes read at {position} should match the stream"
            );
        }
    }

    assert!(rejected > 0, "Early seeks before the start should be rejected");
    assert_eq!(buffer.total_bytes_written(), data.len() as u64);
    assert_eq!(buffer.stats().bytes_lost, 0);
}

/// Test the std::io::Seek adapter together with Read
#[test]
fn test_io_seek_adapter() {
    let data = stream_bytes(512);
    let buffer = RingBuffer::new(1024);
    buffer.write(&data).unwrap();

    let mut handle = &buffer;
    assert_eq!(Seek::seek(&mut handle, SeekFrom::Start(256)).unwrap(), 256);
    let mut out = [0u8; 128];
    handle.read_exact(&mut out).unwrap();
    assert_eq!(&out[..], &data[256..384]);

    assert_eq!(Seek::seek(&mut handle, SeekFrom::Current(-128)).unwrap(), 256);
    assert_eq!(Seek::seek(&mut handle, SeekFrom::End(-1)).unwrap(), 511);
    assert!(Seek::seek(&mut handle, SeekFrom::Start(u64::MAX)).is_err());
    assert_eq!(handle.stream_position().unwrap(), 511);
}
