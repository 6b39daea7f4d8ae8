//! smartpark - parking lot lifecycle control daemon
//!
//! Tracks vehicle entry/exit across a fixed grid of spots, drives the plate
//! detection pipeline, controls the two gates, and settles parking fees.
//!
//! Module structure:
//! - `domain/` - Core business types (spots, tickets, plates, fees)
//! - `io/` - External interfaces (clock, actuator, store, detection source)
//! - `services/` - Business logic (orchestrator, registry, gates, simulation)
//! - `infra/` - Infrastructure (config, metrics)

use clap::Parser;
use smartpark::domain::detection::{decide, ConfidenceThresholds, Disposition};
use smartpark::domain::plate;
use smartpark::infra::{Config, GateMode, Metrics};
use smartpark::io::{
    DetectionSource, FileStore, GateActuator, MemoryStore, ParkingStore, RelayActuator,
    SimActuator, SimulatedCamera, SystemClock,
};
use smartpark::services::{Command, Orchestrator, SimulationDriver};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// smartpark - Smart parking lot control daemon
#[derive(Parser, Debug)]
#[command(name = "smartpark", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

/// Poll the detection source and route readings through the confidence gate.
///
/// Accepted readings become entry commands; review candidates are surfaced
/// for the operator; low-confidence reads are dropped and scanning continues.
async fn detection_loop(
    mut source: impl DetectionSource,
    thresholds: ConfidenceThresholds,
    interval_ms: u64,
    cmd_tx: mpsc::Sender<Command>,
    metrics: Arc<Metrics>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut tick = tokio::time::interval(std::time::Duration::from_millis(interval_ms.max(1)));
    info!(interval_ms = %interval_ms, "detection_loop_started");

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let Some(event) = source.poll().await else { continue };
                let disposition = decide(event.confidence, &thresholds);
                metrics.record_detection(disposition.as_str());

                match disposition {
                    Disposition::Accept => {
                        let normalized = plate::normalize(&event.text);
                        info!(
                            plate = %normalized.code,
                            region = %normalized.region,
                            confidence = %event.confidence,
                            "detection_accepted"
                        );
                        let _ = cmd_tx
                            .send(Command::Entry {
                                plate_code: normalized.code,
                                region: normalized.region,
                            })
                            .await;
                    }
                    Disposition::Review => {
                        // The operator confirms or rejects via Command::Confirm
                        info!(
                            raw = %event.text,
                            confidence = %event.confidence,
                            "detection_review_required"
                        );
                    }
                    Disposition::Discard => {
                        debug!(confidence = %event.confidence, "detection_discarded");
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("detection_loop_stopped");
                    break;
                }
            }
        }
    }
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

    info!("smartpark starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    let gate_mode_str = match config.gate_mode() {
        GateMode::Sim => "sim",
        GateMode::Relay => "relay",
    };
    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        floors = %config.floors(),
        spots_per_floor = %config.spots_per_floor(),
        hourly_rate = %config.hourly_rate(),
        gate_mode = %gate_mode_str,
        gate_auto_close_secs = %config.gate_auto_close_secs(),
        min_confidence = %config.min_confidence(),
        auto_accept_confidence = %config.auto_accept_confidence(),
        simulation = %config.simulation_enabled(),
        data_dir = ?config.data_dir(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Shared components; the store backend is chosen once at startup
    let metrics = Arc::new(Metrics::new());
    let clock = Arc::new(SystemClock);
    let store: Arc<dyn ParkingStore> = match config.data_dir() {
        Some(dir) => Arc::new(FileStore::new(dir)),
        None => Arc::new(MemoryStore::new()),
    };
    let actuator: Arc<dyn GateActuator> = match config.gate_mode() {
        GateMode::Sim => Arc::new(SimActuator),
        GateMode::Relay => Arc::new(RelayActuator::new(
            config.gate_entry_url(),
            config.gate_exit_url(),
            config.gate_timeout_ms(),
        )),
    };

    // Command channel (bounded for backpressure)
    let (cmd_tx, cmd_rx) = mpsc::channel(1000);

    // Start detection pipeline
    let thresholds = ConfidenceThresholds {
        min: config.min_confidence(),
        auto_accept: config.auto_accept_confidence(),
    };
    let detection_tx = cmd_tx.clone();
    let detection_metrics = metrics.clone();
    let detection_interval = config.detection_interval_ms();
    let detection_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        let camera = SimulatedCamera::new(0.25);
        detection_loop(
            camera,
            thresholds,
            detection_interval,
            detection_tx,
            detection_metrics,
            detection_shutdown,
        )
        .await;
    });

    // Start traffic simulation driver
    if config.simulation_enabled() {
        let driver = SimulationDriver::new(&config, cmd_tx.clone());
        let sim_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            driver.run(sim_shutdown).await;
        });
    }

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

    // Drop the original sender so the command channel closes once all
    // producer tasks have shut down
    drop(cmd_tx);

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Build and run the orchestrator - consumes commands until channel closes
    let mut orchestrator = Orchestrator::new(config, store, actuator, metrics, clock).await?;
    info!("orchestrator_started");
    orchestrator.run(cmd_rx).await;

    info!("smartpark shutdown complete");
    Ok(())
}
