//! Gate controller - entry/exit gate state with auto-close timing
//!
//! Each gate opens with a deadline `now + auto_close`; the periodic tick
//! closes it once the deadline elapses. Re-opening replaces the deadline
//! rather than stacking a second timer. Emergency mode forces both gates
//! shut and suppresses opens until lifted.

use crate::domain::types::GateId;
use crate::io::actuator::GateActuator;
use crate::io::clock::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Live state of one gate
#[derive(Debug, Clone, Copy, Default)]
pub struct GateState {
    pub is_open: bool,
    /// Epoch ms at which the tick closes the gate
    pub auto_close_deadline_ms: Option<u64>,
}

pub struct GateController {
    entry: GateState,
    exit: GateState,
    emergency: bool,
    auto_close_ms: u64,
    actuator: Arc<dyn GateActuator>,
    clock: Arc<dyn Clock>,
}

impl GateController {
    pub fn new(auto_close_secs: u64, actuator: Arc<dyn GateActuator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entry: GateState::default(),
            exit: GateState::default(),
            emergency: false,
            auto_close_ms: auto_close_secs * 1000,
            actuator,
            clock,
        }
    }

    fn state_mut(&mut self, gate: GateId) -> &mut GateState {
        match gate {
            GateId::Entry => &mut self.entry,
            GateId::Exit => &mut self.exit,
        }
    }

    pub fn state(&self, gate: GateId) -> GateState {
        match gate {
            GateId::Entry => self.entry,
            GateId::Exit => self.exit,
        }
    }

    pub fn is_open(&self, gate: GateId) -> bool {
        self.state(gate).is_open
    }

    pub fn emergency_engaged(&self) -> bool {
        self.emergency
    }

    /// Open a gate and arm (or re-arm) its auto-close deadline.
    ///
    /// Returns false when emergency mode suppressed the open.
    pub async fn open(&mut self, gate: GateId) -> bool {
        if self.emergency {
            warn!(gate = gate.as_str(), "gate_open_suppressed_emergency");
            return false;
        }

        let deadline = self.clock.now_ms() + self.auto_close_ms;
        let state = self.state_mut(gate);
        state.is_open = true;
        state.auto_close_deadline_ms = Some(deadline);

        info!(gate = gate.as_str(), deadline_ms = %deadline, "gate_opened");

        match gate {
            GateId::Entry => self.actuator.open_entry().await,
            GateId::Exit => self.actuator.open_exit().await,
        }
        true
    }

    /// Force both gates shut immediately
    pub async fn close_all(&mut self) {
        self.entry = GateState::default();
        self.exit = GateState::default();
        info!("gates_closed_all");
        self.actuator.close_all().await;
    }

    /// Engage or lift emergency mode. Engaging closes both gates.
    pub async fn set_emergency(&mut self, engaged: bool) {
        if self.emergency == engaged {
            return;
        }
        self.emergency = engaged;
        info!(engaged = %engaged, "emergency_mode_changed");
        if engaged {
            self.close_all().await;
        }
    }

    /// Close any gate whose deadline has elapsed. Returns the gates closed.
    pub fn tick(&mut self, now_ms: u64) -> Vec<GateId> {
        let mut closed = Vec::new();
        for gate in [GateId::Entry, GateId::Exit] {
            let state = self.state_mut(gate);
            if let Some(deadline) = state.auto_close_deadline_ms {
                if state.is_open && now_ms >= deadline {
                    state.is_open = false;
                    state.auto_close_deadline_ms = None;
                    info!(gate = gate.as_str(), "gate_auto_closed");
                    closed.push(gate);
                }
            }
        }
        closed
    }
}
