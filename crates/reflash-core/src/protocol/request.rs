//! Outbound UDS request construction.

use std::fmt::Write as _;

use super::constants::{
    ACTIVATION_ROUTINE, ALL_DTC_GROUPS, DOWNLOAD_ADDRESS_AND_LENGTH_FORMAT, DOWNLOAD_DATA_FORMAT,
    POSITIVE_RESPONSE_OFFSET, service_id,
};

/// A single diagnostic request: service identifier plus payload.
///
/// Immutable once built; the named constructors below cover every service
/// the flash sequence issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    service_id: u8,
    payload: Vec<u8>,
}

impl Request {
    pub fn new(service_id: u8, payload: Vec<u8>) -> Self {
        Self {
            service_id,
            payload,
        }
    }

    pub fn service_id(&self) -> u8 {
        self.service_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// SID of the positive response that answers this request.
    pub fn expected_response_sid(&self) -> u8 {
        self.service_id.wrapping_add(POSITIVE_RESPONSE_OFFSET)
    }

    /// Full message bytes: SID followed by the payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.payload.len());
        bytes.push(self.service_id);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Render the request as space-separated hex byte pairs, the format
    /// the ISO-TP send tool reads on stdin (e.g. `"10 03"`).
    pub fn wire_hex(&self) -> String {
        let mut out = String::with_capacity((1 + self.payload.len()) * 3);
        let _ = write!(out, "{:02x}", self.service_id);
        for byte in &self.payload {
            let _ = write!(out, " {byte:02x}");
        }
        out
    }

    /// DiagnosticSessionControl (0x10).
    pub fn start_session(session: u8) -> Self {
        Self::new(service_id::DIAGNOSTIC_SESSION_CONTROL, vec![session])
    }

    /// ReadDataByIdentifier (0x22).
    pub fn read_data_by_id(did: u16) -> Self {
        Self::new(service_id::READ_DATA_BY_ID, did.to_be_bytes().to_vec())
    }

    /// WriteDataByIdentifier (0x2E).
    pub fn write_data_by_id(did: u16, record: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(2 + record.len());
        payload.extend_from_slice(&did.to_be_bytes());
        payload.extend_from_slice(record);
        Self::new(service_id::WRITE_DATA_BY_ID, payload)
    }

    /// SecurityAccess (0x27), seed request or key submission.
    pub fn security_access(sub_function: u8, data: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(1 + data.len());
        payload.push(sub_function);
        payload.extend_from_slice(data);
        Self::new(service_id::SECURITY_ACCESS, payload)
    }

    /// RoutineControl (0x31) for the pre-download activation routine.
    pub fn start_routine(routine_id: u16) -> Self {
        let mut payload = Vec::with_capacity(3);
        payload.push(super::constants::routine_sub_function::START_ROUTINE);
        payload.extend_from_slice(&routine_id.to_be_bytes());
        Self::new(service_id::ROUTINE_CONTROL, payload)
    }

    /// RoutineControl request for the canonical activation routine.
    pub fn activate_routine() -> Self {
        Self::start_routine(ACTIVATION_ROUTINE)
    }

    /// RequestDownload (0x34): format identifiers, then 4-byte big-endian
    /// address and size.
    pub fn request_download(address: u32, size: u32) -> Self {
        let mut payload = Vec::with_capacity(10);
        payload.push(DOWNLOAD_DATA_FORMAT);
        payload.push(DOWNLOAD_ADDRESS_AND_LENGTH_FORMAT);
        payload.extend_from_slice(&address.to_be_bytes());
        payload.extend_from_slice(&size.to_be_bytes());
        Self::new(service_id::REQUEST_DOWNLOAD, payload)
    }

    /// TransferData (0x36): block sequence counter plus block data.
    pub fn transfer_data(counter: u8, data: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(1 + data.len());
        payload.push(counter);
        payload.extend_from_slice(data);
        Self::new(service_id::TRANSFER_DATA, payload)
    }

    /// RequestTransferExit (0x37), empty payload.
    pub fn transfer_exit() -> Self {
        Self::new(service_id::REQUEST_TRANSFER_EXIT, Vec::new())
    }

    /// ECUReset (0x11).
    pub fn ecu_reset(reset: u8) -> Self {
        Self::new(service_id::ECU_RESET, vec![reset])
    }

    /// ClearDiagnosticInformation (0x14) for all DTC groups.
    pub fn clear_all_dtcs() -> Self {
        Self::new(service_id::CLEAR_DIAGNOSTIC_INFO, ALL_DTC_GROUPS.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::{did, security_sub_function, session_type};

    #[test]
    fn test_session_request_bytes() {
        let req = Request::start_session(session_type::EXTENDED);
        assert_eq!(req.to_bytes(), vec![0x10, 0x03]);
        assert_eq!(req.expected_response_sid(), 0x50);
    }

    #[test]
    fn test_read_did_big_endian() {
        let req = Request::read_data_by_id(did::VIN);
        assert_eq!(req.to_bytes(), vec![0x22, 0xF1, 0x90]);
    }

    #[test]
    fn test_request_download_layout() {
        let req = Request::request_download(0x0802_0000, 0x0001_2345);
        assert_eq!(
            req.to_bytes(),
            vec![0x34, 0x00, 0x44, 0x08, 0x02, 0x00, 0x00, 0x00, 0x01, 0x23, 0x45]
        );
    }

    #[test]
    fn test_security_access_key_embedding() {
        let req = Request::security_access(security_sub_function::SEND_KEY, &[0x57, 0xE9]);
        assert_eq!(req.to_bytes(), vec![0x27, 0x06, 0x57, 0xE9]);
    }

    #[test]
    fn test_activation_routine_payload() {
        let req = Request::activate_routine();
        assert_eq!(req.to_bytes(), vec![0x31, 0x01, 0xFF, 0x00]);
    }

    #[test]
    fn test_wire_hex_format() {
        let req = Request::start_session(session_type::EXTENDED);
        assert_eq!(req.wire_hex(), "10 03");

        let empty = Request::transfer_exit();
        assert_eq!(empty.wire_hex(), "37");
    }
}
