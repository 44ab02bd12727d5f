//! Transport layer module.

pub mod isotp;
pub mod mock;
pub mod queue;
pub mod traits;

pub use isotp::IsotpProcessTransport;
pub use mock::MockTransport;
pub use queue::{ResponseQueue, spawn_frame_reader};
pub use traits::{Transport, TransportError};
