//! The ordered reflash step sequence.
//!
//! Steps run strictly one at a time: build a request from session state,
//! send it, await exactly one correlated response, validate it, fold the
//! result back into state. The first failure is fatal to the whole
//! procedure; no step is retried or skipped.

use std::io::Cursor;
use std::thread;
use std::time::Duration;

use byteorder::{BigEndian, ReadBytesExt};
use tracing::{debug, error, info};

use super::machine::{SequencerStatus, SessionState};
use crate::error::FlashError;
use crate::events::{FlashEvent, FlashObserver, FlashPhase};
use crate::payload::FirmwareImage;
use crate::protocol::constants::{
    F15A_PROGRAMMING_RECORD, SEED_OFFSET, did, reset_type, security_sub_function, session_type,
};
use crate::protocol::{Request, Response};
use crate::security::SeedKeyAlgorithm;
use crate::transport::{ResponseQueue, Transport};

/// Addressing fields for the RequestDownload step.
#[derive(Debug, Clone, Copy)]
pub struct DownloadParams {
    pub address: u32,
    pub size: u32,
}

/// Everything a step needs: collaborators, accumulated state, the image.
pub struct StepContext<'a> {
    pub transport: &'a dyn Transport,
    pub responses: &'a ResponseQueue,
    pub state: &'a mut SessionState,
    pub image: &'a FirmwareImage,
    pub seed_key: &'a dyn SeedKeyAlgorithm,
    pub download: DownloadParams,
    pub observer: &'a dyn FlashObserver,
    /// Bounded wait for each correlated response.
    pub response_timeout: Duration,
    /// Settling delay before every send.
    pub pacing: Duration,
}

type StepFn = fn(&mut StepContext<'_>, &'static str) -> Result<(), FlashError>;

/// One entry of the canonical sequence.
pub struct Step {
    pub name: &'static str,
    pub phase: FlashPhase,
    pub run: StepFn,
}

/// The canonical 16-step reflash sequence, in execution order.
pub const STEPS: &[Step] = &[
    Step {
        name: "startDiagnosticSession extended",
        phase: FlashPhase::SessionSetup,
        run: start_extended_session,
    },
    Step {
        name: "readDataByIdentifier softwareNumber",
        phase: FlashPhase::Identification,
        run: read_software_number,
    },
    Step {
        name: "readDataByIdentifier vin",
        phase: FlashPhase::Identification,
        run: read_vin,
    },
    Step {
        name: "readDataByIdentifier partNumber",
        phase: FlashPhase::Identification,
        run: read_part_number,
    },
    Step {
        name: "startDiagnosticSession ecuProgramming",
        phase: FlashPhase::SessionSetup,
        run: start_programming_session,
    },
    Step {
        name: "securityAccess requestSeed",
        phase: FlashPhase::SecurityAccess,
        run: request_seed,
    },
    Step {
        name: "securityAccess sendKey",
        phase: FlashPhase::SecurityAccess,
        run: send_key,
    },
    Step {
        name: "readDataByIdentifier F15A",
        phase: FlashPhase::Preparation,
        run: read_vendor_block_a,
    },
    Step {
        name: "activateRoutine 01FF",
        phase: FlashPhase::Preparation,
        run: activate_routine,
    },
    Step {
        name: "readDataByIdentifier F15B",
        phase: FlashPhase::Preparation,
        run: read_vendor_block_b,
    },
    Step {
        name: "requestDownload",
        phase: FlashPhase::Preparation,
        run: request_download,
    },
    Step {
        name: "writeDataByIdentifier F15A",
        phase: FlashPhase::Preparation,
        run: write_vendor_block_a,
    },
    Step {
        name: "transferData",
        phase: FlashPhase::Transfer,
        run: transfer_firmware,
    },
    Step {
        name: "requestTransferExit",
        phase: FlashPhase::Finalize,
        run: transfer_exit,
    },
    Step {
        name: "ecuReset hard",
        phase: FlashPhase::Finalize,
        run: ecu_reset,
    },
    Step {
        name: "clearDiagnosticInformation",
        phase: FlashPhase::Finalize,
        run: clear_dtcs,
    },
];

/// Drive the sequence to completion or the first failure.
pub fn run_sequence(ctx: &mut StepContext<'_>) -> Result<(), FlashError> {
    let mut status = SequencerStatus::Pending(0);
    let mut phase: Option<FlashPhase> = None;

    while let SequencerStatus::Pending(index) = status {
        let step = &STEPS[index];

        if phase != Some(step.phase) {
            if let Some(from) = phase {
                ctx.observer.on_event(&FlashEvent::PhaseChanged {
                    from,
                    to: step.phase,
                });
            }
            phase = Some(step.phase);
        }

        info!(step = index + 1, total = STEPS.len(), name = step.name, "Running step");
        ctx.observer.on_event(&FlashEvent::StepStarted {
            index,
            name: step.name,
        });

        match (step.run)(ctx, step.name) {
            Ok(()) => {
                ctx.observer.on_event(&FlashEvent::StepCompleted {
                    index,
                    name: step.name,
                });
                status = if index + 1 == STEPS.len() {
                    SequencerStatus::Completed
                } else {
                    SequencerStatus::Pending(index + 1)
                };
            }
            Err(e) => {
                status = SequencerStatus::Failed;
                error!(step = index + 1, name = step.name, status = %status, "Step failed: {e}");
                ctx.observer.on_event(&FlashEvent::Failed {
                    step: step.name,
                    message: e.to_string(),
                });
                return Err(e);
            }
        }
    }

    info!(status = %status, "Sequence complete");
    ctx.observer.on_event(&FlashEvent::Complete);
    Ok(())
}

/// Send one request and await its single correlated response, validating
/// the leading byte against the expected positive-response identifier.
fn exchange(
    ctx: &mut StepContext<'_>,
    step: &'static str,
    request: &Request,
) -> Result<Response, FlashError> {
    // Bus settling time.
    thread::sleep(ctx.pacing);

    ctx.observer.on_event(&FlashEvent::Request {
        bytes: request.to_bytes(),
    });
    ctx.transport.send(request)?;

    let response = ctx.responses.await_next(ctx.response_timeout)?;
    ctx.observer.on_event(&FlashEvent::Response {
        bytes: response.bytes().to_vec(),
    });
    debug!(step, tx = %request.wire_hex(), rx = %response.hex(), "Exchange");

    if !response.is_positive_for(request.service_id()) {
        return Err(FlashError::UnexpectedResponse {
            step,
            expected: request.expected_response_sid(),
            response: response.hex(),
        });
    }
    Ok(response)
}

fn read_record(
    ctx: &mut StepContext<'_>,
    step: &'static str,
    data_id: u16,
) -> Result<Vec<u8>, FlashError> {
    let response = exchange(ctx, step, &Request::read_data_by_id(data_id))?;
    Ok(response.bytes()[1..].to_vec())
}

fn start_extended_session(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    exchange(ctx, step, &Request::start_session(session_type::EXTENDED)).map(|_| ())
}

fn read_software_number(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    ctx.state.software_number = Some(read_record(ctx, step, did::SOFTWARE_NUMBER)?);
    Ok(())
}

fn read_vin(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    ctx.state.vin = Some(read_record(ctx, step, did::VIN)?);
    Ok(())
}

fn read_part_number(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    ctx.state.part_number = Some(read_record(ctx, step, did::PART_NUMBER)?);
    Ok(())
}

fn start_programming_session(
    ctx: &mut StepContext<'_>,
    step: &'static str,
) -> Result<(), FlashError> {
    // The target ECU re-enters with the same sub-function byte.
    exchange(ctx, step, &Request::start_session(session_type::EXTENDED)).map(|_| ())
}

fn request_seed(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    let response = exchange(
        ctx,
        step,
        &Request::security_access(security_sub_function::REQUEST_SEED, &[]),
    )?;
    let seed = response
        .bytes()
        .get(SEED_OFFSET..)
        .unwrap_or_default()
        .to_vec();
    debug!(seed = %hex::encode(&seed), "Seed received");

    let key = ctx.seed_key.compute_key(&seed);
    ctx.state.seed = Some(seed);
    ctx.state.key = Some(key);
    Ok(())
}

fn send_key(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    // The seed step always runs first; an absent key can only mean an empty
    // derivation result.
    let key = ctx.state.key.clone().unwrap_or_default();
    let response = exchange(
        ctx,
        step,
        &Request::security_access(security_sub_function::SEND_KEY, &key),
    )?;
    match response.bytes().get(1).copied() {
        Some(security_sub_function::KEY_ACCEPTED) => Ok(()),
        confirmation => Err(FlashError::SecondaryCheckFailed {
            step,
            detail: format!("security access not granted, confirmation byte {confirmation:02X?}"),
        }),
    }
}

fn read_vendor_block_a(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    ctx.state.f15a = Some(read_record(ctx, step, did::VENDOR_BLOCK_A)?);
    Ok(())
}

fn activate_routine(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    exchange(ctx, step, &Request::activate_routine()).map(|_| ())
}

fn read_vendor_block_b(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    ctx.state.f15b = Some(read_record(ctx, step, did::VENDOR_BLOCK_B)?);
    Ok(())
}

fn request_download(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    let request = Request::request_download(ctx.download.address, ctx.download.size);
    let response = exchange(ctx, step, &request)?;

    ctx.state.begin_transfer();
    log_max_block_length(&response);
    debug!(state = ?ctx.state, "Download accepted");
    Ok(())
}

/// The 0x74 response reports the ECU's maximum block length. The transfer
/// uses the fixed block size regardless; this is informational.
fn log_max_block_length(response: &Response) {
    let bytes = response.bytes();
    let Some(&length_format) = bytes.get(1) else {
        return;
    };
    let width = (length_format >> 4) as usize;
    if width == 0 || width > 8 || bytes.len() < 2 + width {
        return;
    }
    let mut cursor = Cursor::new(&bytes[2..2 + width]);
    if let Ok(max_block_length) = cursor.read_uint::<BigEndian>(width) {
        debug!(max_block_length, "ECU reported max block length");
    }
}

fn write_vendor_block_a(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    exchange(
        ctx,
        step,
        &Request::write_data_by_id(did::VENDOR_BLOCK_A, &F15A_PROGRAMMING_RECORD),
    )
    .map(|_| ())
}

fn transfer_firmware(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    let image = ctx.image;
    let total = image.total_blocks();
    if image.is_empty() {
        info!("Firmware image is empty, nothing to transfer");
        return Ok(());
    }

    let mut sent = 0usize;
    for block in image.blocks(ctx.state.transfer_chunk_index) {
        let response = exchange(
            ctx,
            step,
            &Request::transfer_data(block.counter, block.data),
        )?;
        match response.bytes().get(1).copied() {
            Some(echo) if echo == block.counter => {}
            echo => {
                return Err(FlashError::SecondaryCheckFailed {
                    step,
                    detail: format!(
                        "block counter echo mismatch: sent {:#04X}, got {echo:02X?}",
                        block.counter
                    ),
                });
            }
        }
        ctx.state.advance_transfer();
        sent += 1;
        ctx.observer
            .on_event(&FlashEvent::TransferProgress { sent, total });
        debug!(block = sent, total, len = block.data.len(), "Block acknowledged");
    }
    Ok(())
}

fn transfer_exit(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    exchange(ctx, step, &Request::transfer_exit()).map(|_| ())
}

fn ecu_reset(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    exchange(ctx, step, &Request::ecu_reset(reset_type::HARD_RESET)).map(|_| ())
}

fn clear_dtcs(ctx: &mut StepContext<'_>, step: &'static str) -> Result<(), FlashError> {
    exchange(ctx, step, &Request::clear_all_dtcs()).map(|_| ())
}
