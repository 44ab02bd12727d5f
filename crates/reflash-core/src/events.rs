//! Event system for UI decoupling.
//!
//! Allows CLI/TUI/GUI layers to follow the flash procedure without tight
//! coupling to the sequencer.

use std::fmt;

/// Phases of the reflash procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashPhase {
    /// Entering the diagnostic sessions.
    SessionSetup,
    /// Reading identification data.
    Identification,
    /// Seed/key handshake.
    SecurityAccess,
    /// Routine activation, download request, fingerprint write.
    Preparation,
    /// Streaming transfer blocks.
    Transfer,
    /// Transfer exit, reset, DTC clear.
    Finalize,
}

impl fmt::Display for FlashPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashPhase::SessionSetup => write!(f, "Session Setup"),
            FlashPhase::Identification => write!(f, "Identification"),
            FlashPhase::SecurityAccess => write!(f, "Security Access"),
            FlashPhase::Preparation => write!(f, "Preparation"),
            FlashPhase::Transfer => write!(f, "Transfer"),
            FlashPhase::Finalize => write!(f, "Finalize"),
        }
    }
}

/// Events emitted while the sequence runs.
#[derive(Debug, Clone)]
pub enum FlashEvent {
    PhaseChanged {
        from: FlashPhase,
        to: FlashPhase,
    },
    StepStarted {
        index: usize,
        name: &'static str,
    },
    StepCompleted {
        index: usize,
        name: &'static str,
    },
    /// Outbound request message bytes.
    Request {
        bytes: Vec<u8>,
    },
    /// Inbound response frame bytes.
    Response {
        bytes: Vec<u8>,
    },
    /// Transfer block acknowledged.
    TransferProgress {
        sent: usize,
        total: usize,
    },
    /// The whole sequence completed.
    Complete,
    /// The sequence halted at a step.
    Failed {
        step: &'static str,
        message: String,
    },
}

/// Observer trait for receiving flash events.
pub trait FlashObserver: Send + Sync {
    fn on_event(&self, event: &FlashEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl FlashObserver for NullObserver {
    fn on_event(&self, _event: &FlashEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl FlashObserver for TracingObserver {
    fn on_event(&self, event: &FlashEvent) {
        match event {
            FlashEvent::PhaseChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "Phase changed");
            }
            FlashEvent::StepStarted { index, name } => {
                tracing::info!(step = index + 1, name, "Step started");
            }
            FlashEvent::StepCompleted { index, name } => {
                tracing::debug!(step = index + 1, name, "Step completed");
            }
            FlashEvent::Request { bytes } => {
                tracing::trace!(tx = %hex::encode(bytes), "Request");
            }
            FlashEvent::Response { bytes } => {
                tracing::trace!(rx = %hex::encode(bytes), "Response");
            }
            FlashEvent::TransferProgress { sent, total } => {
                let pct = if *total > 0 { sent * 100 / total } else { 100 };
                tracing::debug!(sent, total, progress = %format!("{pct}%"), "Transfer progress");
            }
            FlashEvent::Complete => {
                tracing::info!("Flash procedure complete");
            }
            FlashEvent::Failed { step, message } => {
                tracing::error!(step, "Flash procedure failed: {}", message);
            }
        }
    }
}
