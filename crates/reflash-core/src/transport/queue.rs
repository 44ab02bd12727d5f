//! Inbound frame queue bridging the transport's reader to the sequencer.
//!
//! The reader side pushes every reassembled frame into a bounded channel as
//! it arrives; the sequencer blocks on `await_next` with an explicit
//! timeout. Because the channel buffers frames whether or not a receiver is
//! currently waiting, a response arriving between "send done" and "await
//! registered" cannot be lost.

use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::traits::TransportError;
use crate::protocol::Response;

/// Channel depth. One outstanding request means at most one expected frame;
/// the headroom absorbs stray traffic without blocking the reader.
pub const INBOUND_QUEUE_DEPTH: usize = 32;

/// Single-consumer receive side of the inbound frame channel.
pub struct ResponseQueue {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl ResponseQueue {
    /// Create a bounded channel, returning the sender for the transport's
    /// reader and the queue for the sequencer.
    pub fn channel() -> (SyncSender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::sync_channel(INBOUND_QUEUE_DEPTH);
        (tx, Self { rx })
    }

    /// Block until the next inbound frame arrives, up to `timeout`.
    pub fn await_next(&self, timeout: Duration) -> Result<Response, TransportError> {
        match self.rx.recv_timeout(timeout) {
            Ok(bytes) => Ok(Response::from_bytes(bytes)),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }
}

/// Spawn a thread decoding newline-delimited hex lines from `source` into
/// the frame channel.
///
/// Malformed hex lines are dropped with a warning; the sequencer's bounded
/// wait then surfaces the missing frame as a timeout. The thread ends when
/// the source hits EOF or the queue is gone.
pub fn spawn_frame_reader<R>(source: R, tx: SyncSender<Vec<u8>>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(source);
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Inbound stream read error, stopping reader");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let frame = match Response::from_hex_line(&line) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(line = %line, error = %e, "Dropping malformed hex frame");
                    continue;
                }
            };
            debug!(frame = %frame.hex(), "Inbound frame");
            if tx.send(frame.bytes().to_vec()).is_err() {
                // Consumer is gone, nothing left to deliver to.
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_maps_to_error() {
        let (_tx, queue) = ResponseQueue::channel();
        let err = queue.await_next(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
    }

    #[test]
    fn test_disconnect_maps_to_error() {
        let (tx, queue) = ResponseQueue::channel();
        drop(tx);
        let err = queue.await_next(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, TransportError::Disconnected));
    }

    #[test]
    fn test_frame_buffered_before_await() {
        // The frame arrives before anyone waits; it must not be lost.
        let (tx, queue) = ResponseQueue::channel();
        tx.send(vec![0x50, 0x03]).unwrap();
        let resp = queue.await_next(Duration::from_millis(5)).unwrap();
        assert_eq!(resp.bytes(), &[0x50, 0x03]);
    }

    #[test]
    fn test_reader_decodes_and_skips_garbage() {
        let (tx, queue) = ResponseQueue::channel();
        let input = b"50 03\nnot-hex\n\n62 f1 90 41\n".to_vec();
        let handle = spawn_frame_reader(std::io::Cursor::new(input), tx);

        let first = queue.await_next(Duration::from_millis(100)).unwrap();
        assert_eq!(first.bytes(), &[0x50, 0x03]);
        let second = queue.await_next(Duration::from_millis(100)).unwrap();
        assert_eq!(second.bytes(), &[0x62, 0xF1, 0x90, 0x41]);

        handle.join().unwrap();
    }
}
