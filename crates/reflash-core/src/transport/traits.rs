//! Transport layer abstraction.
//!
//! Defines the `Transport` trait for sending fully formed diagnostic
//! messages, allowing different implementations (ISO-TP tooling, mock).

use thiserror::Error;

use crate::protocol::Request;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to spawn {command}: {message}")]
    SpawnFailed { command: String, message: String },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Send tool exited with {status}")]
    SendRejected { status: String },

    #[error("Transport disconnected")]
    Disconnected,

    #[error("No response within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract diagnostic transport.
///
/// `send` transmits one request atomically as a single protocol message and
/// completes (or fails) before the caller proceeds. Inbound frames travel
/// separately, through the [`ResponseQueue`](super::ResponseQueue) handed
/// out when the transport is constructed; "send completed" and "response
/// received" are independent events.
pub trait Transport: Send + Sync {
    fn send(&self, request: &Request) -> Result<(), TransportError>;
}
