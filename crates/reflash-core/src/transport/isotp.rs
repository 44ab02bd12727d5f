//! ISO-TP transport backed by the can-utils command line tools.
//!
//! Outbound: one `isotpsend` process per request, fed the hex-rendered
//! message on stdin. Inbound: a long-running `isotprecv` loop whose stdout
//! emits one whitespace-separated hex line per reassembled message; a
//! reader thread decodes those lines into the response queue.

use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use super::queue::{ResponseQueue, spawn_frame_reader};
use super::traits::{Transport, TransportError};
use crate::protocol::Request;

const SEND_TOOL: &str = "isotpsend";
const RECV_TOOL: &str = "isotprecv";

/// Point-to-point ISO-TP link over a CAN interface.
pub struct IsotpProcessTransport {
    interface: String,
    source_id: String,
    destination_id: String,
    padding: String,
    receiver: Mutex<Child>,
}

impl IsotpProcessTransport {
    /// Start the receive loop and return the transport together with the
    /// queue of inbound frames.
    pub fn spawn(
        interface: &str,
        source_id: &str,
        destination_id: &str,
        padding: &str,
    ) -> Result<(Self, ResponseQueue), TransportError> {
        // The ECU answers on the reverse address pair.
        let mut receiver = Command::new(RECV_TOOL)
            .args([
                "-s",
                destination_id,
                "-d",
                source_id,
                "-p",
                padding,
                "-l",
                interface,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| TransportError::SpawnFailed {
                command: RECV_TOOL.to_string(),
                message: e.to_string(),
            })?;

        let stdout = receiver
            .stdout
            .take()
            .ok_or_else(|| TransportError::SpawnFailed {
                command: RECV_TOOL.to_string(),
                message: "stdout not captured".to_string(),
            })?;

        let (tx, queue) = ResponseQueue::channel();
        spawn_frame_reader(stdout, tx);

        info!(
            interface,
            source = source_id,
            destination = destination_id,
            "ISO-TP link up"
        );

        Ok((
            Self {
                interface: interface.to_string(),
                source_id: source_id.to_string(),
                destination_id: destination_id.to_string(),
                padding: padding.to_string(),
                receiver: Mutex::new(receiver),
            },
            queue,
        ))
    }
}

impl Transport for IsotpProcessTransport {
    fn send(&self, request: &Request) -> Result<(), TransportError> {
        let body = request.wire_hex();
        debug!(
            interface = %self.interface,
            source = %self.source_id,
            destination = %self.destination_id,
            tx = %body,
            "Sending request"
        );

        let mut child = Command::new(SEND_TOOL)
            .args([
                "-s",
                &self.source_id,
                "-d",
                &self.destination_id,
                "-p",
                &self.padding,
                &self.interface,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| TransportError::SpawnFailed {
                command: SEND_TOOL.to_string(),
                message: e.to_string(),
            })?;

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| TransportError::WriteFailed("stdin not captured".to_string()))?;
            stdin
                .write_all(body.as_bytes())
                .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
            // Closing stdin lets the tool read EOF and transmit.
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(TransportError::SendRejected {
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for IsotpProcessTransport {
    fn drop(&mut self) {
        if let Ok(mut receiver) = self.receiver.lock() {
            if let Err(e) = receiver.kill() {
                warn!(error = %e, "Failed to stop receive loop");
            }
            let _ = receiver.wait();
        }
    }
}
