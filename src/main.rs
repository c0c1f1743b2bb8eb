//! Selfie kiosk - unattended photo booth with a perspective-matched preview
//!
//! Plays an idle loop until a visitor taps the stage, then runs a main video
//! in which the live camera appears inside a frame filmed at an angle. At the
//! end of the preview window the kiosk takes the photo, adds a themed overlay
//! and offers printing and a share link.

mod camera;
mod clock;
mod compose;
mod config;
mod error;
mod flow;
mod kiosk;
mod picker;
mod quad;
mod server;
mod settings;
mod sinks;
mod solver;
mod store;
mod transform;
mod working_hours;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::kiosk::{Devices, Kiosk};
use crate::sinks::{CommandPrinter, HttpUploadSink, QrCodeEncoder, UploadSink};

/// Selfie kiosk
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file path
    #[arg(short, long, default_value = "kiosk.toml")]
    settings: PathBuf,

    /// Web server port (overrides the settings file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Kiosk document path (overrides the settings file)
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Seed for video and overlay selection
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Selfie kiosk v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = settings::Settings::load_or_create(&args.settings)?;
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(document) = args.document {
        settings.storage.document = document;
    }

    let store = store::JsonFileStore::new(&settings.storage.document);
    info!("Kiosk document: {:?}", store.path());
    let config = store::ConfigContext::load(Box::new(store));

    let constraints = settings.camera.constraints();
    info!(
        "Camera: {} at {}x{} @ {}fps",
        constraints.device, constraints.width, constraints.height, constraints.fps
    );

    let uploader: Option<Arc<dyn UploadSink>> = if settings.upload.endpoint.is_empty() {
        info!("Sharing disabled (no upload endpoint)");
        None
    } else {
        let sink = HttpUploadSink::new(settings.upload.endpoint.clone(), settings.upload.timeout())
            .context("Failed to create upload client")?;
        info!("Sharing via {}", settings.upload.endpoint);
        Some(Arc::new(sink))
    };

    let devices = Devices {
        camera: Arc::from(camera::source_for(&constraints.device)),
        constraints,
        printer: Arc::new(CommandPrinter::new(settings.printer.command.clone())),
        uploader,
        qr: Arc::new(QrCodeEncoder::default()),
        preview_size: (settings.stage.width, settings.stage.height),
    };

    let kiosk = Kiosk::new(
        config,
        Arc::new(clock::SystemClock::new()),
        picker::Picker::new(args.seed),
        devices,
    );
    let timers = kiosk.spawn();

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let server_handle = tokio::spawn(async move { server::run_server(&addr, kiosk).await });

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => tracing::error!("Server error: {}", e),
                Err(e) => tracing::error!("Server task panicked: {}", e),
            }
        }
        result = timers => {
            if let Err(e) = result {
                tracing::error!("Timer task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
