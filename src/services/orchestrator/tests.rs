//! Tests for the Orchestrator module

use super::*;
use crate::domain::types::{ActivityKind, SpotStatus};
use crate::io::actuator::SimActuator;
use crate::io::clock::ManualClock;
use crate::io::store::MemoryStore;

/// Test harness holding the clock handle for time travel
struct TestOrchestrator {
    orchestrator: Orchestrator,
    clock: Arc<ManualClock>,
}

impl std::ops::Deref for TestOrchestrator {
    type Target = Orchestrator;
    fn deref(&self) -> &Self::Target {
        &self.orchestrator
    }
}

impl std::ops::DerefMut for TestOrchestrator {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.orchestrator
    }
}

async fn create_orchestrator(floors: u8, spots_per_floor: u16) -> TestOrchestrator {
    let config = Config::default().with_grid(floors, spots_per_floor).with_entry_settle_ms(0);
    create_orchestrator_with_config(config).await
}

async fn create_orchestrator_with_config(config: Config) -> TestOrchestrator {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let orchestrator = Orchestrator::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(SimActuator),
        Arc::new(Metrics::new()),
        clock.clone(),
    )
    .await
    .unwrap();
    TestOrchestrator { orchestrator, clock }
}

async fn park(orch: &mut TestOrchestrator, plate: &str, region: &str) -> FinalizeOutcome {
    orch.handle_entry(plate, region).await;
    orch.finalize_entry(true).await
}

#[tokio::test]
async fn test_entry_issues_pending_ticket() {
    let mut orch = create_orchestrator(1, 4).await;

    orch.handle_entry("11-23456", "بغداد").await;

    let ticket = orch.pending_ticket().expect("ticket pending");
    assert_eq!(ticket.plate_code, "11-23456");
    assert_eq!(ticket.region, "بغداد");
    assert_eq!(orch.incoming(), Some(&("11-23456".to_string(), "بغداد".to_string())));
    // No spot is touched before confirmation
    assert_eq!(orch.occupied_count(), 0);
    assert!(orch.activity().is_empty());
}

#[tokio::test]
async fn test_duplicate_entry_is_idempotent() {
    let mut orch = create_orchestrator(1, 4).await;

    orch.handle_entry("11-23456", "بغداد").await;
    let first_id = orch.pending_ticket().unwrap().id.clone();

    orch.handle_entry("11-23456", "بغداد").await;

    let ticket = orch.pending_ticket().unwrap();
    assert_eq!(ticket.id, first_id, "second trigger must not mint a new ticket");
    assert_eq!(orch.occupied_count(), 0);
}

#[tokio::test]
async fn test_new_plate_supersedes_pending_ticket() {
    let mut orch = create_orchestrator(1, 4).await;

    orch.handle_entry("11-23456", "بغداد").await;
    orch.handle_entry("21-98765", "البصرة").await;

    let ticket = orch.pending_ticket().unwrap();
    assert_eq!(ticket.plate_code, "21-98765");

    // Confirming commits only the superseding car
    orch.finalize_entry(true).await;
    assert_eq!(orch.occupied_count(), 1);
    assert!(orch.registry.find_occupied_by_plate("21-98765").is_some());
    assert!(orch.registry.find_occupied_by_plate("11-23456").is_none());
}

#[tokio::test]
async fn test_entry_ignored_when_plate_parked() {
    let mut orch = create_orchestrator(1, 4).await;
    park(&mut orch, "11-23456", "بغداد").await;

    orch.handle_entry("11-23456", "بغداد").await;
    assert!(orch.pending_ticket().is_none());
    assert_eq!(orch.occupied_count(), 1);
}

#[tokio::test]
async fn test_cancel_has_zero_side_effects() {
    let mut orch = create_orchestrator(1, 4).await;

    let spots_before = serde_json::to_string(orch.spots()).unwrap();
    let log_len_before = orch.activity().len();

    orch.handle_entry("11-23456", "بغداد").await;
    let outcome = orch.finalize_entry(false).await;

    assert_eq!(outcome, FinalizeOutcome::Cancelled);
    assert!(orch.pending_ticket().is_none());
    assert!(orch.incoming().is_none());
    assert_eq!(serde_json::to_string(orch.spots()).unwrap(), spots_before);
    assert_eq!(orch.activity().len(), log_len_before);
    assert!(!orch.gates().is_open(GateId::Entry));
}

#[tokio::test]
async fn test_finalize_without_ticket_is_noop() {
    let mut orch = create_orchestrator(1, 4).await;
    assert_eq!(orch.finalize_entry(true).await, FinalizeOutcome::NoTicket);
    assert_eq!(orch.finalize_entry(false).await, FinalizeOutcome::NoTicket);
}

#[tokio::test]
async fn test_confirmed_entry_commits() {
    let mut orch = create_orchestrator(1, 4).await;

    orch.handle_entry("11-23456", "بغداد").await;
    let outcome = orch.finalize_entry(true).await;

    let FinalizeOutcome::Committed { spot_id, .. } = outcome else {
        panic!("expected committed, got {outcome:?}");
    };
    assert_eq!(spot_id, SpotId::grid(1, 1));

    assert_eq!(orch.occupied_count(), 1);
    let spot = orch.registry.get(&spot_id).unwrap();
    assert_eq!(spot.status, SpotStatus::Occupied);
    assert_eq!(spot.occupant.as_ref().unwrap().plate_code, "11-23456");

    assert_eq!(orch.activity().len(), 1);
    let entry = orch.activity().recent(1).next().unwrap();
    assert_eq!(entry.kind, ActivityKind::Entry);
    assert_eq!(entry.gate_id, "MAIN-ENTRY");
    assert!(entry.amount.is_none());
    assert!(entry.receipt_printed);

    assert!(orch.gates().is_open(GateId::Entry));
    assert!(orch.pending_ticket().is_none());
    assert!(orch.incoming().is_none());
}

#[tokio::test]
async fn test_lot_full_clears_ticket_and_log_unchanged() {
    let mut orch = create_orchestrator(1, 2).await;
    park(&mut orch, "11-11111", "بغداد").await;
    park(&mut orch, "21-22222", "البصرة").await;

    let log_len_before = orch.activity().len();

    orch.handle_entry("31-33333", "نينوى").await;
    let outcome = orch.finalize_entry(true).await;

    assert_eq!(outcome, FinalizeOutcome::LotFull);
    assert!(orch.pending_ticket().is_none());
    assert_eq!(orch.occupied_count(), 2);
    assert_eq!(orch.activity().len(), log_len_before);

    // State returned to idle: a later car can still try
    orch.handle_exit(Some("11-11111")).await;
    let outcome = park(&mut orch, "31-33333", "نينوى").await;
    assert!(matches!(outcome, FinalizeOutcome::Committed { .. }));
}

#[tokio::test]
async fn test_exit_by_plate_settles_fee() {
    let mut orch = create_orchestrator(1, 4).await;
    park(&mut orch, "11-23456", "بغداد").await;

    orch.clock.advance_minutes(90);
    let receipt = orch.handle_exit(Some("11-23456")).await.expect("exit receipt");

    assert_eq!(receipt.plate_code, "11-23456");
    assert_eq!(receipt.amount, 4000, "90 minutes rounds up to two hours");
    assert_eq!(receipt.duration_ms, 90 * 60 * 1000);

    assert_eq!(orch.occupied_count(), 0);
    assert!(orch.gates().is_open(GateId::Exit));
    assert_eq!(orch.total_revenue(), 4000);

    let entry = orch.activity().recent(1).next().unwrap();
    assert_eq!(entry.kind, ActivityKind::Exit);
    assert_eq!(entry.gate_id, "MAIN-EXIT");
    assert_eq!(entry.amount, Some(4000));
}

#[tokio::test]
async fn test_exit_unknown_plate_is_noop() {
    let mut orch = create_orchestrator(1, 4).await;
    park(&mut orch, "11-23456", "بغداد").await;

    let log_len = orch.activity().len();
    assert!(orch.handle_exit(Some("99-00000")).await.is_none());
    assert_eq!(orch.occupied_count(), 1);
    assert_eq!(orch.activity().len(), log_len);
    assert!(!orch.gates().is_open(GateId::Exit));
}

#[tokio::test]
async fn test_random_exit_respects_min_stay() {
    let mut orch = create_orchestrator(1, 4).await;
    park(&mut orch, "11-11111", "بغداد").await;

    // Second car enters just now; only the first is past the 3-minute stay
    orch.clock.advance_minutes(5);
    park(&mut orch, "21-22222", "البصرة").await;

    let receipt = orch.handle_exit(None).await.expect("one eligible occupant");
    assert_eq!(receipt.plate_code, "11-11111");
    assert_eq!(orch.occupied_count(), 1);
}

#[tokio::test]
async fn test_random_exit_without_eligible_is_noop() {
    let mut orch = create_orchestrator(1, 4).await;
    park(&mut orch, "11-11111", "بغداد").await;

    // Still inside the minimum stay window
    assert!(orch.handle_exit(None).await.is_none());
    assert_eq!(orch.occupied_count(), 1);
}

#[tokio::test]
async fn test_exit_sets_outgoing_display_and_tick_clears_it() {
    let mut orch = create_orchestrator(1, 4).await;
    park(&mut orch, "11-23456", "بغداد").await;

    orch.clock.advance_minutes(10);
    orch.handle_exit(Some("11-23456")).await.unwrap();

    assert_eq!(orch.outgoing().unwrap().plate_code, "11-23456");

    // Display holds until its deadline passes
    orch.clock.advance_ms(1000);
    orch.tick();
    assert!(orch.outgoing().is_some());

    orch.clock.advance_ms(2000);
    orch.tick();
    assert!(orch.outgoing().is_none());
}

#[tokio::test]
async fn test_tick_auto_closes_gates() {
    let mut orch = create_orchestrator(1, 4).await;
    park(&mut orch, "11-23456", "بغداد").await;
    assert!(orch.gates().is_open(GateId::Entry));

    orch.clock.advance_ms(5000);
    orch.tick();
    assert!(!orch.gates().is_open(GateId::Entry));
}

#[tokio::test]
async fn test_occupancy_matches_distinct_plates() {
    let mut orch = create_orchestrator(2, 3).await;

    for (plate, region) in
        [("11-11111", "بغداد"), ("21-22222", "البصرة"), ("41-33333", "أربيل")]
    {
        park(&mut orch, plate, region).await;
    }
    assert_eq!(orch.occupied_count(), 3);

    orch.clock.advance_minutes(30);
    orch.handle_exit(Some("21-22222")).await.unwrap();
    assert_eq!(orch.occupied_count(), 2);

    // Re-entry of the exited plate allocates exactly one spot again
    park(&mut orch, "21-22222", "البصرة").await;
    assert_eq!(orch.occupied_count(), 3);

    let mut plates: Vec<&str> = orch
        .spots()
        .iter()
        .filter_map(|s| s.occupant.as_ref())
        .map(|v| v.plate_code.as_str())
        .collect();
    plates.sort();
    plates.dedup();
    assert_eq!(plates.len(), 3, "no plate may occupy more than one spot");
}

#[tokio::test]
async fn test_emergency_suppresses_entry_gate() {
    let mut orch = create_orchestrator(1, 4).await;
    orch.dispatch(Command::Emergency { engaged: true }).await;

    // The lifecycle still commits; only the gate stays shut
    let outcome = park(&mut orch, "11-23456", "بغداد").await;
    assert!(matches!(outcome, FinalizeOutcome::Committed { .. }));
    assert!(!orch.gates().is_open(GateId::Entry));

    orch.dispatch(Command::Emergency { engaged: false }).await;
    orch.dispatch(Command::OpenGate(GateId::Entry)).await;
    assert!(orch.gates().is_open(GateId::Entry));
}

#[tokio::test]
async fn test_command_dispatch_round_trip() {
    let mut orch = create_orchestrator(1, 4).await;

    orch.dispatch(Command::Entry {
        plate_code: "11-23456".to_string(),
        region: "بغداد".to_string(),
    })
    .await;
    orch.dispatch(Command::Confirm { accepted: true }).await;
    assert_eq!(orch.occupied_count(), 1);

    orch.clock.advance_minutes(10);
    orch.dispatch(Command::Exit { plate_code: Some("11-23456".to_string()) }).await;
    assert_eq!(orch.occupied_count(), 0);
    assert_eq!(orch.activity().exit_count(), 1);
}
