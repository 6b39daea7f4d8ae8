//! Domain - core business types and pure decision logic
//!
//! This module contains the parking domain proper:
//! - `types` - Spots, vehicles, tickets, activity entries, detection events
//! - `plate` - License plate normalization (province code lookup)
//! - `detection` - Confidence-based detection disposition
//! - `fees` - Parking fee calculation

pub mod detection;
pub mod fees;
pub mod plate;
pub mod types;

pub use detection::{decide, ConfidenceThresholds, Disposition};
pub use fees::FeeSchedule;
pub use types::{ActivityEntry, ActivityKind, DetectionEvent, GateId, Spot, SpotStatus, Ticket, Vehicle};
