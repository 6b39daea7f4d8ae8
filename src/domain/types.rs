//! Shared types for the parking control core

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// Newtype wrapper for spot IDs to provide type safety
///
/// Spot ids are stable grid addresses, e.g. "A-07" for floor 1, spot 7.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SpotId(pub String);

impl SpotId {
    /// Build the grid address for a (floor, index) pair.
    ///
    /// Floor 1 is prefixed "A", floor 2 "B", with a zero-padded index:
    /// `SpotId::grid(1, 7)` is "A-07".
    pub fn grid(floor: u8, index: u16) -> Self {
        let prefix = (b'A' + floor.saturating_sub(1)) as char;
        SpotId(format!("{}-{:02}", prefix, index))
    }
}

impl std::fmt::Display for SpotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two physical gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateId {
    Entry,
    Exit,
}

impl GateId {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateId::Entry => "entry",
            GateId::Exit => "exit",
        }
    }
}

/// Occupancy state of a spot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotStatus {
    Free,
    Occupied,
}

/// Vehicle currently occupying a spot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub plate_code: String,
    pub region: String,
    /// Entry time, epoch milliseconds
    pub entry_ms: u64,
}

/// One physical parking space
///
/// Invariant: `occupant` is `Some` iff `status == Occupied`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spot {
    pub id: SpotId,
    pub floor: u8,
    pub status: SpotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupant: Option<Vehicle>,
    /// Last allocate/release, epoch milliseconds
    pub last_changed_ms: u64,
}

impl Spot {
    pub fn new(id: SpotId, floor: u8, now_ms: u64) -> Self {
        Self { id, floor, status: SpotStatus::Free, occupant: None, last_changed_ms: now_ms }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.status == SpotStatus::Free
    }
}

/// Pending entry receipt, minted on an accepted detection
///
/// Lives only between `handle_entry` and `finalize_entry` (or supersession).
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: String,
    pub plate_code: String,
    pub region: String,
    /// When the ticket was minted, epoch milliseconds
    pub issued_ms: u64,
}

impl Ticket {
    pub fn new(plate_code: &str, region: &str, now_ms: u64) -> Self {
        Self {
            id: new_uuid_v7(),
            plate_code: plate_code.to_string(),
            region: region.to_string(),
            issued_ms: now_ms,
        }
    }
}

/// Kind of activity ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Entry,
    Exit,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Entry => "entry",
            ActivityKind::Exit => "exit",
        }
    }
}

/// Immutable activity ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub kind: ActivityKind,
    /// Epoch milliseconds
    pub timestamp_ms: u64,
    pub plate_code: String,
    pub gate_id: String,
    /// Charge in IQD, exit entries only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    pub receipt_printed: bool,
}

impl ActivityEntry {
    pub fn entry(ticket_id: &str, plate_code: &str, now_ms: u64) -> Self {
        Self {
            id: ticket_id.to_string(),
            kind: ActivityKind::Entry,
            timestamp_ms: now_ms,
            plate_code: plate_code.to_string(),
            gate_id: "MAIN-ENTRY".to_string(),
            amount: None,
            receipt_printed: true,
        }
    }

    pub fn exit(plate_code: &str, amount: u64, now_ms: u64) -> Self {
        Self {
            id: new_uuid_v7(),
            kind: ActivityKind::Exit,
            timestamp_ms: now_ms,
            plate_code: plate_code.to_string(),
            gate_id: "MAIN-EXIT".to_string(),
            amount: Some(amount),
            receipt_printed: false,
        }
    }
}

/// Raw recognizer output, consumed by the detection gate and never stored
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionEvent {
    pub text: String,
    /// Recognizer certainty in [0, 1]
    pub confidence: f64,
    /// Bounding box, [x, y, width, height] in frame pixels
    #[serde(rename = "box")]
    pub bbox: [f64; 4],
}
