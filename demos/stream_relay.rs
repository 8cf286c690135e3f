//! Stream relay example for the tuner ring buffer
//!
//! This example demonstrates:
//! 1. Configuring a spilling ring buffer
//! 2. Feeding it from a simulated RTP receive thread (7 TS packets per datagram)
//! 3. Consuming it from a recorder thread that peeks at the stream start
//!    before recording, the way a demuxer probes its input
//! 4. Closing the buffer to signal end of stream
//! 5. Checking the recording against the source with a CRC32 digest
//!
//! Run with `RUST_LOG=debug` to see overflow, seek and lifecycle events.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tuner_ring_buffer::{BufferConfig, RingBuffer, SeekOrigin, WriteOutcome};

const TS_PACKET_SIZE: usize = 188;
const PACKETS_PER_DATAGRAM: usize = 7;
const DATAGRAMS: usize = 20_000;

/// Build one datagram of sync-byte prefixed transport stream packets
fn datagram(rng: &mut StdRng) -> Vec<u8> {
    let mut payload = vec![0u8; TS_PACKET_SIZE * PACKETS_PER_DATAGRAM];
    for packet in payload.chunks_mut(TS_PACKET_SIZE) {
        rng.fill(&mut packet[1..]);
        packet[0] = 0x47;
    }
    payload
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = BufferConfig::spilling(2 * 1024 * 1024);
    let buffer = Arc::new(RingBuffer::with_config(config).expect("valid buffer configuration"));

    // Producer: bursts of datagrams with short pauses, like a tuner socket
    let producer = {
        let buffer = Arc::clone(&buffer);
        thread::Builder::new()
            .name("rtp-receiver".to_string())
            .spawn(move || {
                let mut rng = StdRng::seed_from_u64(DATAGRAMS as u64);
                let mut digest = crc32fast::Hasher::new();
                let mut sent = 0usize;

                for i in 0..DATAGRAMS {
                    let payload = datagram(&mut rng);
                    match buffer.write(&payload).expect("datagram fits in the ring") {
                        WriteOutcome::Written | WriteOutcome::Spilled => {
                            digest.update(&payload);
                            sent += payload.len();
                        }
                        WriteOutcome::Dropped | WriteOutcome::Closed => {}
                    }
                    if i % 500 == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                }

                buffer.close();
                (digest.finalize(), sent)
            })
            .expect("spawn producer")
    };

    // Consumer: probe the first packets, then record everything
    let recorder = {
        let buffer = Arc::clone(&buffer);
        thread::Builder::new()
            .name("recorder".to_string())
            .spawn(move || {
                // Probe the stream start without consuming it
                let mut probe = [0u8; TS_PACKET_SIZE * 4];
                while buffer.read_available() < probe.len() && !buffer.is_closed() {
                    thread::sleep(Duration::from_millis(1));
                }
                let probed = buffer.peek(0, &mut probe).expect("stream start is retained");
                let synced = probe[..probed]
                    .chunks(TS_PACKET_SIZE)
                    .all(|packet| packet[0] == 0x47);
                let buffered = buffer
                    .seek(SeekOrigin::Size, 0)
                    .expect("size query never fails");
                info!(probed, synced, buffered, "probed stream start");

                let mut digest = crc32fast::Hasher::new();
                let mut recorded = 0usize;
                let mut chunk = vec![0u8; 64 * 1024];
                loop {
                    match buffer.read_into(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => {
                            digest.update(&chunk[..n]);
                            recorded += n;
                        }
                        Err(err) => panic!("recording failed: {err}"),
                    }
                }
                (digest.finalize(), recorded)
            })
            .expect("spawn recorder")
    };

    let (sent_digest, sent) = producer.join().expect("producer thread");
    let (recorded_digest, recorded) = recorder.join().expect("recorder thread");
    let stats = buffer.stats();

    println!("Sent {sent} bytes, recorded {recorded} bytes");
    println!(
        "Lost {} bytes, spilled {} bytes through the overflow queue",
        stats.bytes_lost, stats.bytes_spilled
    );

    if sent_digest == recorded_digest {
        println!("Recording matches the source stream (crc32 {recorded_digest:08x})");
    } else {
        println!("Recording differs from the source stream");
    }
}
