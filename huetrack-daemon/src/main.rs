//! huetrackd: vision coprocessor daemon.
//!
//! Loads the camera configuration, brings up the telemetry session and the
//! cameras, starts the blue and red detection pipelines against the first
//! camera, then idles until interrupted.

use clap::Parser;
use huetrack_camera::CameraRegistry;
use huetrack_config::{FrcConfig, DEFAULT_CONFIG_PATH};
use huetrack_core::NtMode;
use huetrack_telemetry::{TelemetryInstance, NT_PORT};
use huetrack_vision::{offset_publisher, ColorBallExtractor, SharedOffset, VisionPipeline};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// How often the main task wakes while idling.
const IDLE_WAKE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "huetrackd", about = "Color-tracking vision coprocessor daemon")]
struct Cli {
    /// Path to the camera configuration file.
    #[arg(value_name = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // A bad configuration means there is nothing useful to run; report it
    // and exit cleanly without touching cameras or telemetry.
    let config = match FrcConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };

    let telemetry = TelemetryInstance::new();
    match config.nt_mode {
        NtMode::Server => {
            info!("setting up telemetry server");
            telemetry
                .start_server(SocketAddr::from((Ipv4Addr::UNSPECIFIED, NT_PORT)))
                .await?;
        }
        NtMode::Client => {
            info!("setting up telemetry client for team {}", config.team);
            telemetry.start_client(config.team);
            telemetry.start_ds_client();
        }
    }

    let cameras = CameraRegistry::open_all(&config.cameras);

    // Vision runs against the first camera only; extra cameras just stream.
    if let Some(primary) = cameras.first() {
        info!("starting detection pipelines on camera '{}'", primary.name());
        let shared = SharedOffset::new();
        let vision = telemetry.table("Vision");

        VisionPipeline::spawn(
            primary.subscribe(),
            ColorBallExtractor::blue(),
            offset_publisher(vision.entry("BLUE"), shared.clone()),
        );
        VisionPipeline::spawn(
            primary.subscribe(),
            ColorBallExtractor::red(),
            offset_publisher(vision.entry("RED"), shared.clone()),
        );
    } else {
        info!("no cameras opened, vision processing disabled");
    }

    // Stay resident; pipelines run in the background until the process is
    // interrupted. No teardown is attempted on exit.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, exiting");
                return Ok(());
            }
            _ = tokio::time::sleep(IDLE_WAKE) => {}
        }
    }
}
