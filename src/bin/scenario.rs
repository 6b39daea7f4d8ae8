//! Scripted lifecycle scenario runner
//!
//! Drives the orchestrator through a full entry/exit cycle against a manual
//! clock and prints the resulting ledger. Useful for eyeballing the lifecycle
//! without waiting on real timers.
//!
//! Usage:
//!   cargo run --bin scenario -- --spots 4 --stay-minutes 90

use clap::Parser;
use smartpark::domain::types::GateId;
use smartpark::infra::{Config, Metrics};
use smartpark::io::{ManualClock, MemoryStore, SimActuator};
use smartpark::services::orchestrator::{FinalizeOutcome, Orchestrator};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scenario", about = "Scripted parking lifecycle runner")]
struct Args {
    /// Spots per floor (single floor)
    #[arg(long, default_value = "4")]
    spots: u16,

    /// Simulated stay duration before exit
    #[arg(long, default_value = "90")]
    stay_minutes: u64,

    /// Number of vehicles to cycle through
    #[arg(long, default_value = "3")]
    vehicles: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    // Settle delay only slows a scripted run down
    let config = Config::default().with_grid(1, args.spots).with_entry_settle_ms(0);

    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let metrics = Arc::new(Metrics::new());
    let mut orchestrator = Orchestrator::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(SimActuator),
        metrics.clone(),
        clock.clone(),
    )
    .await?;

    let plates = ["1123456", "2198765", "4155555", "6144444", "3177777"];

    for i in 0..args.vehicles as usize {
        let raw = plates[i % plates.len()];
        let plate = smartpark::domain::plate::normalize(raw);

        orchestrator.handle_entry(&plate.code, &plate.region).await;
        match orchestrator.finalize_entry(true).await {
            FinalizeOutcome::Committed { spot_id, .. } => {
                println!("ENTRY  {} ({}) -> spot {}", plate.code, plate.region, spot_id);
            }
            other => {
                println!("ENTRY  {} rejected: {:?}", plate.code, other);
                continue;
            }
        }

        clock.advance_minutes(args.stay_minutes);
        match orchestrator.handle_exit(Some(plate.code.as_str())).await {
            Some(receipt) => println!(
                "EXIT   {} after {} min -> {} IQD",
                receipt.plate_code,
                receipt.duration_ms / 60_000,
                receipt.amount
            ),
            None => println!("EXIT   {} had no match", plate.code),
        }

        // Let the gates fall shut between vehicles
        clock.advance_ms(10_000);
        orchestrator.tick();
        assert!(!orchestrator.gates().is_open(GateId::Entry));
        assert!(!orchestrator.gates().is_open(GateId::Exit));
    }

    println!("--- ledger (newest first) ---");
    for entry in orchestrator.activity().entries() {
        println!(
            "{} {:5} plate={} gate={} amount={:?}",
            entry.timestamp_ms,
            entry.kind.as_str(),
            entry.plate_code,
            entry.gate_id,
            entry.amount
        );
    }
    println!("revenue total: {} IQD", orchestrator.total_revenue());

    Ok(())
}
