//! Parking lifecycle orchestration
//!
//! The Orchestrator is the single owner of parking state and coordinates:
//! - Pending-ticket lifecycle (issue, supersede, confirm, cancel)
//! - Spot allocation and release via the registry
//! - Fee calculation on exit
//! - Gate commands and auto-close timing
//! - The append-only activity ledger and its persistence
//!
//! All mutations are serialized through one actor task consuming the command
//! channel; timers and detection feeds never touch state directly.

mod handlers;
#[cfg(test)]
mod tests;

use crate::domain::fees::FeeSchedule;
use crate::domain::types::{GateId, Spot, SpotId, Ticket};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::actuator::GateActuator;
use crate::io::clock::Clock;
use crate::io::store::ParkingStore;
use crate::services::activity_log::ActivityLog;
use crate::services::gates::GateController;
use crate::services::registry::SpotRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

/// External triggers accepted by the actor loop.
///
/// Detection feeds, the simulation driver, and operator controls all speak
/// this one vocabulary; none of them hold a reference to parking state.
#[derive(Debug, Clone)]
pub enum Command {
    /// An accepted detection or a manual entry action
    Entry { plate_code: String, region: String },
    /// Operator (or auto-confirm) decision on the pending ticket
    Confirm { accepted: bool },
    /// Exit trigger; `None` picks a random eligible occupant
    Exit { plate_code: Option<String> },
    /// Manual gate control
    OpenGate(GateId),
    /// Emergency stop toggle
    Emergency { engaged: bool },
}

/// Result of `finalize_entry`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Vehicle parked, ledger updated, entry gate commanded open
    Committed { spot_id: SpotId, ticket_id: String },
    /// Operator rejected the candidate; no state was touched
    Cancelled,
    /// No pending ticket to act on
    NoTicket,
    /// Every spot occupied; the ticket was discarded and the car turned away
    LotFull,
    /// The plate was already parked when the confirm landed
    DuplicatePlate,
}

/// Settled charge handed back from `handle_exit`
#[derive(Debug, Clone, PartialEq)]
pub struct ExitReceipt {
    pub spot_id: SpotId,
    pub plate_code: String,
    pub region: String,
    pub amount: u64,
    pub duration_ms: u64,
}

/// Transient "car leaving" display state, cleared by the tick
#[derive(Debug, Clone)]
pub struct OutgoingDisplay {
    pub plate_code: String,
    pub region: String,
    clear_at_ms: u64,
}

/// Central owner of parking state
pub struct Orchestrator {
    pub(crate) registry: SpotRegistry,
    pub(crate) activity: ActivityLog,
    pub(crate) gates: GateController,
    pub(crate) fees: FeeSchedule,
    /// At most one unconfirmed ticket system-wide
    pub(crate) pending: Option<Ticket>,
    /// "Car at the entry gate" display signal
    pub(crate) incoming: Option<(String, String)>,
    pub(crate) outgoing: Option<OutgoingDisplay>,
    /// Re-entrancy guard over the entry/exit read-modify-write sequences
    pub(crate) in_flight: bool,
    pub(crate) store: Arc<dyn ParkingStore>,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: Config,
}

impl Orchestrator {
    /// Build the orchestrator, restoring spots and ledger history from the
    /// store when present, otherwise initializing the configured grid.
    pub async fn new(
        config: Config,
        store: Arc<dyn ParkingStore>,
        actuator: Arc<dyn GateActuator>,
        metrics: Arc<Metrics>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let now_ms = clock.now_ms();

        let persisted = store.load_spots().await?;
        let registry = if persisted.is_empty() {
            let registry =
                SpotRegistry::with_grid(config.floors(), config.spots_per_floor(), now_ms);
            store.save_spots(registry.spots()).await?;
            registry
        } else {
            info!(spots = %persisted.len(), "spot_grid_restored");
            SpotRegistry::from_spots(persisted)
        };

        let history = store.load_recent_logs(config.log_cap()).await?;
        let activity = ActivityLog::from_history(history, config.log_cap());

        let gates = GateController::new(config.gate_auto_close_secs(), actuator, clock.clone());
        let fees = FeeSchedule {
            hourly_rate: config.hourly_rate(),
            minimum_charge: config.minimum_charge(),
        };

        metrics.set_occupied(registry.occupied_count() as u64);

        Ok(Self {
            registry,
            activity,
            gates,
            fees,
            pending: None,
            incoming: None,
            outgoing: None,
            in_flight: false,
            store,
            metrics,
            clock,
            config,
        })
    }

    /// Start the actor, consuming commands until the channel closes
    pub async fn run(&mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        let mut tick_interval =
            interval(Duration::from_millis(self.config.tick_interval_ms().max(1)));

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.dispatch(cmd).await,
                        None => break, // Channel closed
                    }
                }
                _ = tick_interval.tick() => {
                    self.tick();
                }
            }
        }
    }

    /// Process a single command, dispatching to the appropriate handler
    pub async fn dispatch(&mut self, cmd: Command) {
        debug!(cmd = ?cmd, "command_received");
        match cmd {
            Command::Entry { plate_code, region } => {
                self.handle_entry(&plate_code, &region).await;
            }
            Command::Confirm { accepted } => {
                self.finalize_entry(accepted).await;
            }
            Command::Exit { plate_code } => {
                self.handle_exit(plate_code.as_deref()).await;
            }
            Command::OpenGate(gate) => {
                self.open_gate(gate).await;
            }
            Command::Emergency { engaged } => {
                self.gates.set_emergency(engaged).await;
            }
        }
    }

    // Read accessors for hosts and tests

    pub fn pending_ticket(&self) -> Option<&Ticket> {
        self.pending.as_ref()
    }

    pub fn incoming(&self) -> Option<&(String, String)> {
        self.incoming.as_ref()
    }

    pub fn outgoing(&self) -> Option<&OutgoingDisplay> {
        self.outgoing.as_ref()
    }

    pub fn spots(&self) -> &[Spot] {
        self.registry.spots()
    }

    pub fn occupied_count(&self) -> usize {
        self.registry.occupied_count()
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn gates(&self) -> &GateController {
        &self.gates
    }

    pub fn total_revenue(&self) -> u64 {
        self.activity.total_revenue()
    }
}
