//! Session state accumulated while the sequence runs.

use std::fmt;

/// Values discovered step by step during the procedure.
///
/// Created empty at orchestration start; each field is written exactly once
/// by the step that owns it and only read by later steps. Never reset.
#[derive(Debug, Default)]
pub struct SessionState {
    pub software_number: Option<Vec<u8>>,
    pub vin: Option<Vec<u8>>,
    pub part_number: Option<Vec<u8>>,
    pub f15a: Option<Vec<u8>>,
    pub f15b: Option<Vec<u8>>,
    /// Challenge seed from the security-access step.
    pub seed: Option<Vec<u8>>,
    /// Key computed from the seed by the injected algorithm.
    pub key: Option<Vec<u8>>,
    /// Rolling block sequence counter. Initialized to 1 when the download
    /// request is accepted, incremented per acknowledged block, wrapping
    /// 0xFF -> 0x00.
    pub transfer_chunk_index: u8,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the transfer counter after an accepted download request.
    pub fn begin_transfer(&mut self) {
        self.transfer_chunk_index = 1;
    }

    /// Advance the counter past an acknowledged block.
    pub fn advance_transfer(&mut self) {
        self.transfer_chunk_index = self.transfer_chunk_index.wrapping_add(1);
    }
}

/// Sequencer progress. `Failed` and `Completed` are terminal; there is no
/// retry and no rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerStatus {
    /// Waiting to run the step at this index.
    Pending(usize),
    Failed,
    Completed,
}

impl SequencerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SequencerStatus::Failed | SequencerStatus::Completed)
    }
}

impl fmt::Display for SequencerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencerStatus::Pending(index) => write!(f, "PENDING({index})"),
            SequencerStatus::Failed => write!(f, "FAILED"),
            SequencerStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}
