use anyhow::{Context, Result, bail};
use clap::Parser;
use reflash_core::{FlashConfig, FlashSession, StaticKey};
use tracing::{error, info};

/// Accept both `0x08020000` and plain decimal.
fn parse_u32(s: &str) -> Result<u32, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("invalid number '{s}': {e}"))
}

#[derive(Parser, Debug)]
#[command(author, version, about = "UDS firmware reflash tool (ISO-TP over can-utils)", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Path to the firmware image
    #[arg(long)]
    image: Option<String>,

    /// CAN interface (e.g. can0)
    #[arg(long)]
    interface: Option<String>,

    /// Tester CAN identifier (e.g. 7E0)
    #[arg(long)]
    source: Option<String>,

    /// ECU CAN identifier (e.g. 7E8)
    #[arg(long)]
    destination: Option<String>,

    /// Download start address
    #[arg(long, value_parser = parse_u32)]
    address: Option<u32>,

    /// Declared image size; defaults to the image file length
    #[arg(long, value_parser = parse_u32)]
    size: Option<u32>,

    /// Security-access key as hex bytes (e.g. 57E951FD)
    #[arg(long)]
    key: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(args: &Args) -> Result<FlashConfig> {
    let mut config = match &args.config {
        Some(path) => FlashConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => FlashConfig::default(),
    };

    if let Some(image) = &args.image {
        config.image_path = image.clone();
    }
    if let Some(interface) = &args.interface {
        config.interface = interface.clone();
    }
    if let Some(source) = &args.source {
        config.source_id = source.clone();
    }
    if let Some(destination) = &args.destination {
        config.destination_id = destination.clone();
    }
    if let Some(address) = args.address {
        config.address = address;
    }
    if let Some(size) = args.size {
        config.size = size;
    }
    if config.size == 0 {
        let metadata = std::fs::metadata(&config.image_path)
            .with_context(|| format!("cannot stat image {}", config.image_path))?;
        config.size = u32::try_from(metadata.len()).context("image larger than 4 GiB")?;
        info!(size = config.size, "Using image file length as declared size");
    }
    Ok(config)
}

fn run() -> Result<()> {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let key = StaticKey::from_hex(&args.key).context("invalid --key hex string")?;
    let config = build_config(&args)?;
    if config.address == 0 {
        bail!("download address is required (--address or config file)");
    }

    info!(
        interface = %config.interface,
        source = %config.source_id,
        destination = %config.destination_id,
        "Starting reflash"
    );

    let mut session = FlashSession::new(config, Box::new(key));
    session.run()?;
    info!("Reflash complete");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {e:#}");
        std::process::exit(1);
    }
}
