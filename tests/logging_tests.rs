//! Overflow logging is edge-triggered: one line per transition, never per write

use std::io;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tuner_ring_buffer::{BufferConfig, RingBuffer, WriteOutcome};

/// Log sink shared between the subscriber and the test
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    /// Captured `(warn, info)` line counts, emptying the sink
    fn take(&self) -> (usize, usize) {
        let text = {
            let mut buf = self.0.lock().unwrap();
            let text = String::from_utf8_lossy(&buf).into_owned();
            buf.clear();
            text
        };
        let count = |level: &str| {
            text.lines()
                .filter(|line| line.split_whitespace().next() == Some(level))
                .count()
        };
        (count("WARN"), count("INFO"))
    }
}

/// Run `f` with every INFO and WARN event of this thread captured
fn with_captured_logs(f: impl FnOnce(&CapturedLogs)) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || f(&logs));
}

/// Test that a run of dropped writes logs once, and recovery logs once
#[test]
fn test_drop_episode_logs_edges() {
    with_captured_logs(|logs| {
        let buffer = RingBuffer::with_config(BufferConfig::dropping(64)).unwrap();
        buffer.write(&[0; 60]).unwrap();
        logs.take();

        for _ in 0..50 {
            assert_eq!(buffer.write(&[1; 10]).unwrap(), WriteOutcome::Dropped);
        }
        assert_eq!(logs.take(), (1, 0), "Dropped writes should warn once");

        buffer.read(64).unwrap();
        assert_eq!(buffer.write(&[2; 10]).unwrap(), WriteOutcome::Written);
        assert_eq!(buffer.write(&[3; 10]).unwrap(), WriteOutcome::Written);
        assert_eq!(logs.take(), (0, 1), "Recovery should be logged once");

        buffer.write(&[4; 40]).unwrap();
        for _ in 0..20 {
            assert_eq!(buffer.write(&[5; 10]).unwrap(), WriteOutcome::Dropped);
        }
        assert_eq!(logs.take(), (1, 0), "A new episode should warn again");
    });
}

/// Test that a run of spilled writes logs once, and the drain logs once
#[test]
fn test_spill_episode_logs_edges() {
    with_captured_logs(|logs| {
        let buffer = RingBuffer::with_config(BufferConfig::spilling(64)).unwrap();
        buffer.write(&[0; 60]).unwrap();
        logs.take();

        for _ in 0..20 {
            assert_eq!(buffer.write(&[1; 10]).unwrap(), WriteOutcome::Spilled);
        }
        assert_eq!(logs.take(), (1, 0), "Spilled writes should warn once");

        let mut drained = 0;
        while drained < 260 {
            drained += buffer.read(64).unwrap().len();
        }
        assert_eq!(buffer.stats().bytes_queued, 0);
        assert_eq!(logs.take(), (0, 1), "Draining the queue should be logged once");

        buffer.write(&[2; 60]).unwrap();
        assert_eq!(buffer.write(&[3; 10]).unwrap(), WriteOutcome::Spilled);
        assert_eq!(buffer.write(&[3; 10]).unwrap(), WriteOutcome::Spilled);
        assert_eq!(logs.take(), (1, 0), "A new episode should warn again");
    });
}
