//! Orchestration error types.

use thiserror::Error;

use crate::transport::TransportError;

/// Fatal failure of the flash procedure. Every variant aborts the sequence
/// at the failing step; there is no retry or rollback.
#[derive(Error, Debug)]
pub enum FlashError {
    /// The response's leading byte was not the expected positive-response
    /// identifier. Covers negative responses and malformed frames alike.
    #[error("step '{step}': unexpected response [{response}], expected SID {expected:#04X}")]
    UnexpectedResponse {
        step: &'static str,
        expected: u8,
        /// Hex rendering of the offending frame.
        response: String,
    },

    /// A step-specific secondary field check failed (security-access
    /// confirmation byte, transfer-block counter echo).
    #[error("step '{step}': {detail}")]
    SecondaryCheckFailed { step: &'static str, detail: String },

    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}
