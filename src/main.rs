//! Wildguard - wildlife intrusion alert daemon
//!
//! Watches a PIR motion sensor, captures a still image on motion, runs an
//! object-detection classifier, and texts a fixed recipient list over a
//! serial GSM modem when the target species is found. Runs unattended on
//! Raspberry Pi class hardware.
//!
//! Module structure:
//! - `domain/` - Core types (MotionEvent, Detection, CapturedImage)
//! - `io/` - External interfaces (motion sensor, camera, modem)
//! - `services/` - Business logic (AlertPipeline, detector, evidence)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use wildguard::infra::{Config, Metrics};
use wildguard::io::{CameraCapture, MotionMonitor, SmsModem};
use wildguard::services::{AlertPipeline, EvidenceStore, YoloProcessDetector};

/// Wildguard - wildlife intrusion alert device
#[derive(Parser, Debug)]
#[command(name = "wildguard", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = env!("GIT_HASH"), "wildguard starting");

    let args = Args::parse();

    // Load configuration from TOML file, falling back to built-in defaults
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        site_id = %config.site_id(),
        sensor_gpio_pin = %config.sensor_gpio_pin(),
        camera_command = %config.camera_command(),
        modem_device = %config.modem_device(),
        modem_baud = %config.modem_baud(),
        recipients = %config.recipients().len(),
        target_class = %config.target_class(),
        confidence_threshold = %config.confidence_threshold(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Open the modem once for the process lifetime; a device that cannot
    // reach its modem cannot alert, so this failure is fatal at startup
    let modem = SmsModem::open(&config)?;

    let metrics = Arc::new(Metrics::new());

    // Create motion event channel (bounded; at most a handful of
    // transitions are ever pending)
    let (event_tx, event_rx) = mpsc::channel(16);

    // Start the motion monitor on a blocking worker - the GPIO interrupt
    // wait is a blocking call
    let monitor = MotionMonitor::new(&config).with_event_tx(event_tx);
    let monitor_shutdown = shutdown_rx.clone();
    tokio::task::spawn_blocking(move || {
        monitor.run(monitor_shutdown);
    });

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run the pipeline - consumes motion events until the monitor stops
    let mut pipeline = AlertPipeline::new(
        &config,
        CameraCapture::new(&config),
        Box::new(YoloProcessDetector::new(&config)),
        Box::new(modem),
        EvidenceStore::new(&config),
        metrics,
    );
    pipeline.run(event_rx).await;

    info!("wildguard shutdown complete");
    Ok(())
}
