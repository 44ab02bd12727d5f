//! Session state and the step sequencer.

pub mod machine;
pub mod steps;

pub use machine::{SequencerStatus, SessionState};
pub use steps::{DownloadParams, STEPS, Step, StepContext, run_sequence};
