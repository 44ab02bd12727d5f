//! Core library for UDS firmware reflashing over ISO-TP.
//!
//! Drives a fixed diagnostic sequence against an ECU: extended session,
//! identification reads, security access, programming session, download
//! negotiation, chunked data transfer and post-flash cleanup. The transport
//! is pluggable; the production one shells out to the can-utils ISO-TP
//! tools, the mock one scripts responses for tests.

pub mod error;
pub mod events;
pub mod payload;
pub mod protocol;
pub mod security;
pub mod session;
pub mod state;
pub mod transport;

pub use error::FlashError;
pub use events::{FlashEvent, FlashObserver, FlashPhase, NullObserver, TracingObserver};
pub use payload::{BLOCK_PAYLOAD_SIZE, FirmwareImage, TransferBlock};
pub use protocol::{Request, Response};
pub use security::{SeedKeyAlgorithm, StaticKey};
pub use session::{FlashConfig, FlashSession};
pub use state::{DownloadParams, SequencerStatus, SessionState};
pub use transport::{
    IsotpProcessTransport, MockTransport, ResponseQueue, Transport, TransportError,
};
