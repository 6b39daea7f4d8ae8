//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `orchestrator` - Central lifecycle actor (entry/exit, pending ticket)
//! - `registry` - Spot table with atomic allocate/release
//! - `gates` - Gate state machine with auto-close and emergency mode
//! - `activity_log` - Capped append-only ledger
//! - `simulation` - Timer-driven traffic generator

pub mod activity_log;
pub mod gates;
pub mod orchestrator;
pub mod registry;
pub mod simulation;

// Re-export commonly used types
pub use gates::GateController;
pub use orchestrator::{Command, ExitReceipt, FinalizeOutcome, Orchestrator};
pub use registry::SpotRegistry;
pub use simulation::SimulationDriver;
