//! Protocol module - UDS (ISO 14229) request/response definitions.

pub mod constants;
pub mod request;
pub mod response;

pub use constants::*;
pub use request::Request;
pub use response::Response;
