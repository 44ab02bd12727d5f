//! Mock transport for testing the step sequencer.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::mpsc::SyncSender;

use super::queue::ResponseQueue;
use super::traits::{Transport, TransportError};
use crate::protocol::Request;

/// What the mock does after recording a sent request.
enum ScriptedReply {
    /// Deliver this frame into the response queue.
    Respond(Vec<u8>),
    /// Stay silent; the caller's bounded wait will time out.
    Silence,
}

/// Mock transport that records outbound requests and answers them from a
/// pre-scripted queue of responses.
pub struct MockTransport {
    script: Mutex<VecDeque<ScriptedReply>>,
    sent: Mutex<Vec<Vec<u8>>>,
    fail_sends: Mutex<bool>,
    tx: SyncSender<Vec<u8>>,
}

impl MockTransport {
    pub fn new() -> (Self, ResponseQueue) {
        let (tx, queue) = ResponseQueue::channel();
        let mock = Self {
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            fail_sends: Mutex::new(false),
            tx,
        };
        (mock, queue)
    }

    /// Script the frame answering the next unanswered request.
    pub fn script_response(&self, bytes: &[u8]) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Respond(bytes.to_vec()));
    }

    /// Script a withheld response for the next request.
    pub fn script_silence(&self) {
        self.script.lock().unwrap().push_back(ScriptedReply::Silence);
    }

    /// Deliver a frame without waiting for a request.
    pub fn inject_frame(&self, bytes: &[u8]) {
        self.tx.send(bytes.to_vec()).expect("queue receiver dropped");
    }

    /// Make every subsequent send fail.
    pub fn fail_sends(&self) {
        *self.fail_sends.lock().unwrap() = true;
    }

    /// All requests sent so far, as raw message bytes.
    pub fn sent_requests(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &Request) -> Result<(), TransportError> {
        if *self.fail_sends.lock().unwrap() {
            return Err(TransportError::WriteFailed("simulated failure".into()));
        }
        self.sent.lock().unwrap().push(request.to_bytes());
        match self.script.lock().unwrap().pop_front() {
            Some(ScriptedReply::Respond(bytes)) => {
                // Queued immediately, before the caller registers its wait;
                // the buffering queue makes that ordering safe.
                self.tx.send(bytes).map_err(|_| TransportError::Disconnected)?;
            }
            Some(ScriptedReply::Silence) | None => {}
        }
        Ok(())
    }
}
