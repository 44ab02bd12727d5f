//! Flash session - high-level orchestrator for the reflash procedure.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::events::{FlashObserver, TracingObserver};
use crate::payload::FirmwareImage;
use crate::security::SeedKeyAlgorithm;
use crate::state::{DownloadParams, SessionState, StepContext, run_sequence};
use crate::transport::{IsotpProcessTransport, ResponseQueue, Transport};

fn default_padding() -> String {
    "AA:AA".to_string()
}

fn default_response_timeout_ms() -> u64 {
    5000
}

fn default_pacing_ms() -> u64 {
    10
}

/// Configuration for a flash session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashConfig {
    /// CAN interface name.
    pub interface: String,
    /// Tester (source) CAN identifier, as the ISO-TP tools expect it.
    pub source_id: String,
    /// ECU (destination) CAN identifier.
    pub destination_id: String,
    /// ISO-TP padding parameter (tx:rx).
    #[serde(default = "default_padding")]
    pub padding: String,
    /// Download start address for RequestDownload.
    pub address: u32,
    /// Declared image byte size for RequestDownload.
    pub size: u32,
    /// Path to the firmware image.
    pub image_path: String,
    /// Bounded wait per response.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Settling delay before each send.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            interface: "can0".to_string(),
            source_id: "7E0".to_string(),
            destination_id: "7E8".to_string(),
            padding: default_padding(),
            address: 0,
            size: 0,
            image_path: "tune.bin".to_string(),
            response_timeout_ms: default_response_timeout_ms(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl FlashConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FlashConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Flash session - owns the configuration, the observer and the injected
/// seed/key capability, and drives the step sequence over a transport.
pub struct FlashSession<O: FlashObserver> {
    config: FlashConfig,
    observer: Arc<O>,
    seed_key: Box<dyn SeedKeyAlgorithm>,
    image: Option<FirmwareImage>,
}

impl FlashSession<TracingObserver> {
    /// Create a new session with the default tracing observer.
    pub fn new(config: FlashConfig, seed_key: Box<dyn SeedKeyAlgorithm>) -> Self {
        Self::with_observer(config, seed_key, Arc::new(TracingObserver))
    }
}

impl<O: FlashObserver + 'static> FlashSession<O> {
    /// Create a new session with a custom observer.
    pub fn with_observer(
        config: FlashConfig,
        seed_key: Box<dyn SeedKeyAlgorithm>,
        observer: Arc<O>,
    ) -> Self {
        Self {
            config,
            observer,
            seed_key,
            image: None,
        }
    }

    /// Supply the firmware image directly instead of reading it from the
    /// configured path.
    pub fn set_image(&mut self, image: FirmwareImage) {
        self.image = Some(image);
    }

    fn load_image(&mut self) -> Result<()> {
        if self.image.is_some() {
            return Ok(());
        }
        info!(path = %self.config.image_path, "Loading firmware image");
        let image = FirmwareImage::from_file(&self.config.image_path)?;
        if self.config.size != 0 && self.config.size as usize != image.len() {
            warn!(
                declared = self.config.size,
                actual = image.len(),
                "Declared size differs from image length"
            );
        }
        self.image = Some(image);
        Ok(())
    }

    /// Run the complete flash procedure over the configured ISO-TP link.
    #[instrument(skip(self))]
    pub fn run(&mut self) -> Result<()> {
        self.load_image()?;
        let (transport, responses) = IsotpProcessTransport::spawn(
            &self.config.interface,
            &self.config.source_id,
            &self.config.destination_id,
            &self.config.padding,
        )?;
        self.run_with_transport(&transport, &responses)
    }

    /// Run the procedure over an externally supplied transport.
    pub fn run_with_transport(
        &mut self,
        transport: &dyn Transport,
        responses: &ResponseQueue,
    ) -> Result<()> {
        self.load_image()?;
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| anyhow!("firmware image not loaded"))?;

        let mut state = SessionState::new();
        let mut ctx = StepContext {
            transport,
            responses,
            state: &mut state,
            image,
            seed_key: self.seed_key.as_ref(),
            download: DownloadParams {
                address: self.config.address,
                size: self.config.size,
            },
            observer: self.observer.as_ref(),
            response_timeout: Duration::from_millis(self.config.response_timeout_ms),
            pacing: Duration::from_millis(self.config.pacing_ms),
        };
        run_sequence(&mut ctx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullObserver;
    use crate::security::StaticKey;
    use crate::transport::MockTransport;

    #[test]
    fn test_config_toml_round_trip() {
        let config = FlashConfig {
            interface: "vcan0".to_string(),
            address: 0x0802_0000,
            size: 1234,
            ..Default::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: FlashConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_defaults_applied() {
        let parsed: FlashConfig = toml::from_str(
            r#"
            interface = "vcan0"
            source_id = "77A"
            destination_id = "7E0"
            address = 0x08020000
            size = 1234
            image_path = "tune.bin"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.padding, "AA:AA");
        assert_eq!(parsed.response_timeout_ms, 5000);
        assert_eq!(parsed.pacing_ms, 10);
    }

    #[test]
    fn test_session_runs_over_injected_transport() {
        let image = FirmwareImage::from_bytes(vec![0x42; 100]);
        let (mock, queue) = MockTransport::new();
        mock.script_response(&[0x50, 0x03]);
        mock.script_response(&[0x62, 0xF1, 0x21]);
        mock.script_response(&[0x62, 0xF1, 0x90]);
        mock.script_response(&[0x62, 0xF1, 0x11]);
        mock.script_response(&[0x50, 0x03]);
        mock.script_response(&[0x67, 0x05, 0x01, 0x02]);
        mock.script_response(&[0x67, 0x02]);
        mock.script_response(&[0x62, 0xF1, 0x5A]);
        mock.script_response(&[0x71, 0x01, 0xFF, 0x00]);
        mock.script_response(&[0x62, 0xF1, 0x5B]);
        mock.script_response(&[0x74, 0x20, 0x0F, 0xFA]);
        mock.script_response(&[0x6E, 0xF1, 0x5A]);
        mock.script_response(&[0x76, 0x01]);
        mock.script_response(&[0x77]);
        mock.script_response(&[0x51, 0x01]);
        mock.script_response(&[0x54]);

        let config = FlashConfig {
            size: 100,
            pacing_ms: 0,
            response_timeout_ms: 50,
            ..Default::default()
        };
        let mut session = FlashSession::with_observer(
            config,
            Box::new(StaticKey::new(vec![0x12, 0x34])),
            Arc::new(NullObserver),
        );
        session.set_image(image);
        session.run_with_transport(&mock, &queue).unwrap();

        assert_eq!(mock.sent_requests().len(), 16);
    }
}
