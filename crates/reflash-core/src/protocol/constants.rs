//! UDS protocol constants used by the reflash procedure.
//!
//! Only the services and identifiers the flash sequence actually touches
//! are listed here; this is a tester, not a full ISO 14229 stack.

/// A positive response SID is the request SID plus this offset.
pub const POSITIVE_RESPONSE_OFFSET: u8 = 0x40;

/// Leading byte of a negative response frame.
pub const NEGATIVE_RESPONSE: u8 = 0x7F;

/// Service identifiers.
pub mod service_id {
    pub const DIAGNOSTIC_SESSION_CONTROL: u8 = 0x10;
    pub const ECU_RESET: u8 = 0x11;
    pub const CLEAR_DIAGNOSTIC_INFO: u8 = 0x14;
    pub const READ_DATA_BY_ID: u8 = 0x22;
    pub const SECURITY_ACCESS: u8 = 0x27;
    pub const WRITE_DATA_BY_ID: u8 = 0x2E;
    pub const ROUTINE_CONTROL: u8 = 0x31;
    pub const REQUEST_DOWNLOAD: u8 = 0x34;
    pub const TRANSFER_DATA: u8 = 0x36;
    pub const REQUEST_TRANSFER_EXIT: u8 = 0x37;
}

/// Sub-functions for DiagnosticSessionControl (0x10).
pub mod session_type {
    /// Extended diagnostic session. The target ECU uses the same
    /// sub-function byte when re-entering for programming.
    pub const EXTENDED: u8 = 0x03;
}

/// Sub-functions for SecurityAccess (0x27).
pub mod security_sub_function {
    /// Request seed, access level 3 (odd sub-function).
    pub const REQUEST_SEED: u8 = 0x05;
    /// Send key for the requested level (seed sub-function + 1).
    pub const SEND_KEY: u8 = 0x06;
    /// Confirmation byte the ECU echoes when the key is accepted.
    pub const KEY_ACCEPTED: u8 = 0x02;
}

/// Sub-functions for ECUReset (0x11).
pub mod reset_type {
    pub const HARD_RESET: u8 = 0x01;
}

/// Sub-functions for RoutineControl (0x31).
pub mod routine_sub_function {
    pub const START_ROUTINE: u8 = 0x01;
}

/// Data identifiers read or written during the procedure.
pub mod did {
    pub const SOFTWARE_NUMBER: u16 = 0xF121;
    pub const PART_NUMBER: u16 = 0xF111;
    pub const VIN: u16 = 0xF190;
    pub const VENDOR_BLOCK_A: u16 = 0xF15A;
    pub const VENDOR_BLOCK_B: u16 = 0xF15B;
}

/// Routine identifier activated before download (payload `01 FF 00`).
pub const ACTIVATION_ROUTINE: u16 = 0xFF00;

/// RequestDownload (0x34) dataFormatIdentifier: no compression, no encryption.
pub const DOWNLOAD_DATA_FORMAT: u8 = 0x00;

/// RequestDownload addressAndLengthFormatIdentifier: 4-byte address,
/// 4-byte size.
pub const DOWNLOAD_ADDRESS_AND_LENGTH_FORMAT: u8 = 0x44;

/// DTC group selector for ClearDiagnosticInformation: all groups.
pub const ALL_DTC_GROUPS: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Seed bytes start at this offset in the SecurityAccess seed response
/// (after the response SID and the echoed sub-function).
pub const SEED_OFFSET: usize = 2;

/// Vendor programming record written to DID F15A before the transfer.
pub const F15A_PROGRAMMING_RECORD: [u8; 10] =
    [0x00, 0x00, 0x03, 0x0D, 0x09, 0x06, 0x00, 0x00, 0x00, 0x00];
