//! Handlers for the Orchestrator
//!
//! Every guard condition here resolves as a silent no-op: duplicate triggers
//! from overlapping timers and detection loops are expected traffic, not
//! errors. The only loud failure is a registry invariant breach, which is a
//! programming error.

use super::{ExitReceipt, FinalizeOutcome, Orchestrator, OutgoingDisplay};
use crate::domain::types::{ActivityEntry, GateId, SpotId, Ticket, Vehicle};
use crate::services::registry::AllocError;
use rand::Rng;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

impl Orchestrator {
    /// Handle an accepted detection or manual entry trigger.
    ///
    /// Issues a pending ticket after the detection settle delay. A ticket
    /// already awaiting confirmation for a *different* plate is superseded -
    /// only one car can physically be at the gate. Duplicate triggers for
    /// the same plate, and plates already parked, are ignored.
    pub async fn handle_entry(&mut self, plate_code: &str, region: &str) {
        if self.in_flight {
            debug!(plate = %plate_code, "entry_ignored_in_flight");
            return;
        }
        if self.incoming.as_ref().is_some_and(|(p, _)| p == plate_code)
            || self.pending.as_ref().is_some_and(|t| t.plate_code == plate_code)
        {
            debug!(plate = %plate_code, "entry_ignored_duplicate_trigger");
            return;
        }
        if self.registry.find_occupied_by_plate(plate_code).is_some() {
            debug!(plate = %plate_code, "entry_ignored_already_parked");
            return;
        }

        self.in_flight = true;

        // Newest arrival wins: discard a stale unconfirmed ticket
        if let Some(stale) = self.pending.take() {
            info!(
                stale_ticket = %stale.id,
                stale_plate = %stale.plate_code,
                new_plate = %plate_code,
                "ticket_superseded"
            );
            self.metrics.record_ticket_superseded();
        }

        self.incoming = Some((plate_code.to_string(), region.to_string()));

        // Detection pipeline settle window before the ticket is minted
        let settle_ms = self.config.entry_settle_ms();
        if settle_ms > 0 {
            sleep(Duration::from_millis(settle_ms)).await;
        }

        let ticket = Ticket::new(plate_code, region, self.clock.now_ms());
        info!(
            ticket = %ticket.id,
            plate = %plate_code,
            region = %region,
            "ticket_issued"
        );
        self.metrics.record_ticket_issued();
        self.pending = Some(ticket);

        self.in_flight = false;
    }

    /// Resolve the pending ticket.
    ///
    /// `accepted == false` discards it with zero side effects. On confirm the
    /// first free spot is allocated, the ledger gets an entry row, and the
    /// entry gate opens. A full lot still clears the ticket - the car is
    /// turned away, not left in limbo.
    pub async fn finalize_entry(&mut self, accepted: bool) -> FinalizeOutcome {
        if self.in_flight {
            debug!("finalize_ignored_in_flight");
            return FinalizeOutcome::NoTicket;
        }

        if !accepted {
            self.incoming = None;
            return match self.pending.take() {
                Some(ticket) => {
                    info!(ticket = %ticket.id, plate = %ticket.plate_code, "entry_cancelled");
                    self.metrics.record_entry_cancelled();
                    FinalizeOutcome::Cancelled
                }
                None => FinalizeOutcome::NoTicket,
            };
        }

        let Some(ticket) = self.pending.take() else {
            debug!("finalize_ignored_no_ticket");
            return FinalizeOutcome::NoTicket;
        };
        self.incoming = None;

        let now_ms = self.clock.now_ms();
        let vehicle = Vehicle {
            plate_code: ticket.plate_code.clone(),
            region: ticket.region.clone(),
            entry_ms: now_ms,
        };

        let spot_id = match self.registry.allocate_first_free(vehicle, now_ms) {
            Ok(spot_id) => spot_id,
            Err(AllocError::LotFull) => {
                warn!(ticket = %ticket.id, plate = %ticket.plate_code, "entry_rejected_lot_full");
                self.metrics.record_lot_full();
                return FinalizeOutcome::LotFull;
            }
            Err(AllocError::DuplicatePlate) => {
                info!(ticket = %ticket.id, plate = %ticket.plate_code, "entry_discarded_duplicate_plate");
                return FinalizeOutcome::DuplicatePlate;
            }
        };

        let entry = ActivityEntry::entry(&ticket.id, &ticket.plate_code, now_ms);
        self.activity.append(entry.clone());
        self.persist(&entry).await;

        self.metrics.record_entry_committed(&ticket.region);
        self.metrics.set_occupied(self.registry.occupied_count() as u64);

        if self.gates.open(GateId::Entry).await {
            self.metrics.record_gate_command();
        }

        info!(
            ticket = %ticket.id,
            plate = %ticket.plate_code,
            spot = %spot_id,
            occupied = %self.registry.occupied_count(),
            "entry_committed"
        );

        FinalizeOutcome::Committed { spot_id, ticket_id: ticket.id }
    }

    /// Handle an exit trigger.
    ///
    /// With a plate, targets that occupant; without, picks uniformly among
    /// spots past the minimum stay. No target is a silent no-op. Otherwise
    /// the fee is settled, the spot released, the ledger extended, and the
    /// exit gate opened.
    pub async fn handle_exit(&mut self, plate_code: Option<&str>) -> Option<ExitReceipt> {
        if self.in_flight {
            debug!("exit_ignored_in_flight");
            return None;
        }
        self.in_flight = true;
        let receipt = self.settle_exit(plate_code).await;
        self.in_flight = false;
        receipt
    }

    async fn settle_exit(&mut self, plate_code: Option<&str>) -> Option<ExitReceipt> {
        let now_ms = self.clock.now_ms();

        let target: Option<SpotId> = match plate_code {
            Some(plate) => self.registry.find_occupied_by_plate(plate).map(|s| s.id.clone()),
            None => {
                let eligible =
                    self.registry.eligible_for_exit(self.config.min_stay_minutes(), now_ms);
                if eligible.is_empty() {
                    None
                } else {
                    let pick = rand::thread_rng().gen_range(0..eligible.len());
                    Some(eligible[pick].id.clone())
                }
            }
        };

        let Some(spot_id) = target else {
            debug!(plate = ?plate_code, "exit_ignored_no_target");
            return None;
        };

        let Some(vehicle) = self.registry.release(&spot_id, now_ms) else {
            // Target vanished between lookup and release: invariant breach
            error!(spot = %spot_id, "exit_release_lost_occupant");
            return None;
        };

        let amount = self.fees.cost(vehicle.entry_ms, now_ms);
        let duration_ms = now_ms.saturating_sub(vehicle.entry_ms);

        let entry = ActivityEntry::exit(&vehicle.plate_code, amount, now_ms);
        self.activity.append(entry.clone());
        self.persist(&entry).await;

        self.metrics.record_exit(amount);
        self.metrics.set_occupied(self.registry.occupied_count() as u64);

        if self.gates.open(GateId::Exit).await {
            self.metrics.record_gate_command();
        }

        self.outgoing = Some(OutgoingDisplay {
            plate_code: vehicle.plate_code.clone(),
            region: vehicle.region.clone(),
            clear_at_ms: now_ms + self.config.outgoing_display_ms(),
        });

        info!(
            plate = %vehicle.plate_code,
            spot = %spot_id,
            duration_ms = %duration_ms,
            amount = %amount,
            occupied = %self.registry.occupied_count(),
            "exit_committed"
        );

        Some(ExitReceipt {
            spot_id,
            plate_code: vehicle.plate_code,
            region: vehicle.region,
            amount,
            duration_ms,
        })
    }

    /// Manual gate control from the operator panel
    pub async fn open_gate(&mut self, gate: GateId) {
        if self.gates.open(gate).await {
            self.metrics.record_gate_command();
        }
    }

    /// Periodic housekeeping: gate auto-close and display clearing
    pub fn tick(&mut self) {
        let now_ms = self.clock.now_ms();
        self.gates.tick(now_ms);

        if self.outgoing.as_ref().is_some_and(|o| now_ms >= o.clear_at_ms) {
            debug!("outgoing_display_cleared");
            self.outgoing = None;
        }
    }

    /// Push the current spots snapshot and a ledger row to the store.
    /// Persistence failures are logged, never propagated into the lifecycle.
    async fn persist(&self, entry: &ActivityEntry) {
        if let Err(e) = self.store.save_spots(self.registry.spots()).await {
            error!(error = %e, "spots_persist_failed");
        }
        if let Err(e) = self.store.append_log(entry).await {
            error!(error = %e, entry = %entry.id, "ledger_persist_failed");
        }
    }
}
