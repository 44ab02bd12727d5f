//! Inbound UDS response frames.

use super::constants::{NEGATIVE_RESPONSE, POSITIVE_RESPONSE_OFFSET};

/// A fully reassembled response frame as delivered by the transport.
///
/// Byte 0 is the response service identifier by convention; a response is
/// only meaningful next to the request it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response(Vec<u8>);

impl Response {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decode a whitespace-tolerant hex line (`"62 F1 90 .."` or
    /// `"62f190.."`) into a response frame.
    pub fn from_hex_line(line: &str) -> Result<Self, hex::FromHexError> {
        let compact: String = line.split_whitespace().collect();
        Ok(Self(hex::decode(compact)?))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Response service identifier (first byte), if the frame is non-empty.
    pub fn service_id(&self) -> Option<u8> {
        self.0.first().copied()
    }

    /// Whether this is the positive response for the given request SID.
    pub fn is_positive_for(&self, request_sid: u8) -> bool {
        self.service_id() == Some(request_sid.wrapping_add(POSITIVE_RESPONSE_OFFSET))
    }

    /// Whether this carries the negative-response marker.
    pub fn is_negative(&self) -> bool {
        self.service_id() == Some(NEGATIVE_RESPONSE)
    }

    /// Lowercase hex rendering for logs.
    pub fn hex(&self) -> String {
        hex::encode(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_line_with_spaces() {
        let resp = Response::from_hex_line("62 F1 90 41 42").unwrap();
        assert_eq!(resp.bytes(), &[0x62, 0xF1, 0x90, 0x41, 0x42]);
    }

    #[test]
    fn test_hex_line_compact() {
        let resp = Response::from_hex_line("6702").unwrap();
        assert_eq!(resp.bytes(), &[0x67, 0x02]);
    }

    #[test]
    fn test_malformed_hex_rejected() {
        assert!(Response::from_hex_line("6").is_err());
        assert!(Response::from_hex_line("zz").is_err());
    }

    #[test]
    fn test_positive_check() {
        let resp = Response::from_bytes(vec![0x50, 0x03]);
        assert!(resp.is_positive_for(0x10));
        assert!(!resp.is_positive_for(0x22));
    }

    #[test]
    fn test_negative_marker() {
        let resp = Response::from_bytes(vec![0x7F, 0x27, 0x35]);
        assert!(resp.is_negative());
        assert!(!resp.is_positive_for(0x27));
    }

    #[test]
    fn test_empty_frame_is_never_positive() {
        let resp = Response::from_bytes(Vec::new());
        assert_eq!(resp.service_id(), None);
        assert!(!resp.is_positive_for(0x10));
    }
}
