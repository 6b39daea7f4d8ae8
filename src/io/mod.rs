//! IO - external collaborator interfaces
//!
//! This module contains the injected seams to the outside world:
//! - `clock` - Time source (system or manual, for deterministic tests)
//! - `actuator` - Physical gate actuation (log-only sim or HTTP relay)
//! - `store` - Persistence (in-memory or file-backed snapshot + ledger)
//! - `detection_feed` - Plate detection source (simulated camera)

pub mod actuator;
pub mod clock;
pub mod detection_feed;
pub mod store;

// Re-export commonly used types
pub use actuator::{GateActuator, RelayActuator, SimActuator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use detection_feed::{DetectionSource, SimulatedCamera};
pub use store::{FileStore, MemoryStore, ParkingStore};
