//! End-to-end engine scenarios driven by a simulated clock and a shared
//! in-memory store.

use std::sync::Arc;

use heistwatch_core::{Event, MemoryStore, Phase, PhaseTimer, Rating, Store};

const T0: u64 = 1_700_000_000_000;

#[test]
fn full_cycle_records_one_run() {
    let mut engine = PhaseTimer::new();

    engine.start_setup_at(T0);
    assert_eq!(engine.phase(), Phase::Setup);

    let event = engine.complete_setup_at(T0 + 65_000);
    match event {
        Some(Event::SetupCompleted { duration_ms, .. }) => assert_eq!(duration_ms, 65_000),
        other => panic!("expected SetupCompleted, got {other:?}"),
    }
    assert_eq!(engine.phase(), Phase::HeistReady);
    assert_eq!(engine.setup_laps()[0].rating, Rating::Good);

    engine.start_heist_at(T0 + 65_000);
    assert_eq!(engine.phase(), Phase::Heist);

    let event = engine.complete_heist_at(T0 + 95_000);
    match event {
        Some(Event::HeistCompleted {
            heist_duration_ms,
            total_duration_ms,
            setup_count,
            ..
        }) => {
            assert_eq!(heist_duration_ms, 30_000);
            assert_eq!(total_duration_ms, 95_000);
            assert_eq!(setup_count, 1);
        }
        other => panic!("expected HeistCompleted, got {other:?}"),
    }
    assert_eq!(engine.phase(), Phase::Ready);
    assert!(engine.setup_laps().is_empty());
    assert_eq!(engine.heist_runs().len(), 1);
}

#[test]
fn exactly_one_interval_runs_at_any_point() {
    let mut engine = PhaseTimer::new();

    let check = |engine: &PhaseTimer| {
        let session = engine.session();
        let setup_running = session.phase == Phase::Setup;
        let heist_running = session.phase == Phase::Heist;
        assert!(!(setup_running && heist_running));
        assert_eq!(setup_running, session.lap_start_ms != 0);
        assert_eq!(heist_running, session.heist_start_ms != 0);
        assert_eq!(engine.is_ticking(), setup_running || heist_running);
    };

    check(&engine);
    engine.start_setup_at(T0);
    check(&engine);
    engine.complete_setup_at(T0 + 10_000);
    check(&engine);
    engine.start_setup_at(T0 + 15_000);
    check(&engine);
    engine.complete_setup_at(T0 + 25_000);
    check(&engine);
    engine.start_heist_at(T0 + 30_000);
    check(&engine);
    engine.complete_heist_at(T0 + 50_000);
    check(&engine);
    engine.reset_at(true, T0 + 60_000);
    check(&engine);
}

#[test]
fn overflow_scenario_at_fifteen_minutes() {
    let mut engine = PhaseTimer::new();
    engine.start_setup_at(T0);
    engine.tick_at(T0 + 900_000);

    let rings = engine.overflow_rings_at(T0 + 900_000);
    assert_eq!(rings.len(), 1);
    assert_eq!(rings[0].local_elapsed_ms, 480_000);

    let primary = engine.ring_state_at(T0 + 900_000);
    assert_eq!(primary.fraction, 1.0);
}

#[test]
fn session_survives_a_reload() {
    let store = Arc::new(MemoryStore::new());

    let mut engine = PhaseTimer::load(Box::new(store.clone()));
    engine.set_label("vault");
    engine.start_setup_at(T0);
    engine.complete_setup_at(T0 + 42_000);
    engine.start_heist_at(T0 + 50_000);
    engine.complete_heist_at(T0 + 80_000);
    engine.set_label("getaway");
    engine.start_setup_at(T0 + 90_000);
    engine.complete_setup_at(T0 + 100_000);
    let saved = engine.session().clone();
    drop(engine);

    let reloaded = PhaseTimer::load(Box::new(store));
    assert_eq!(reloaded.phase(), Phase::HeistReady);
    assert_eq!(reloaded.current_label(), "getaway");
    assert_eq!(reloaded.session().pending_laps, saved.pending_laps);
    assert_eq!(reloaded.session().completed_runs, saved.completed_runs);
    // Aggregates are recomputed, not trusted.
    assert_eq!(
        reloaded.session().setup_elapsed_total_ms,
        reloaded.session().pending_total_ms()
    );
}

#[test]
fn reload_mid_setup_keeps_the_lap_running() {
    let store = Arc::new(MemoryStore::new());

    let mut engine = PhaseTimer::load(Box::new(store.clone()));
    engine.start_setup_at(T0);
    drop(engine);

    let mut reloaded = PhaseTimer::load(Box::new(store));
    assert_eq!(reloaded.phase(), Phase::Setup);
    assert!(reloaded.is_ticking());
    // The lap keeps counting from its original start.
    let event = reloaded.complete_setup_at(T0 + 30_000);
    assert!(event.is_some());
    assert_eq!(reloaded.setup_laps()[0].duration_ms, 30_000);
}

#[test]
fn legacy_completed_phase_normalizes_to_ready() {
    let store = Arc::new(MemoryStore::new());
    store.set(
        "session",
        r#"{"phase":"completed","pendingLaps":[{"durationMs":5000}],"setupElapsedTotal":999999}"#,
    );

    let engine = PhaseTimer::load(Box::new(store));
    assert_eq!(engine.phase(), Phase::Ready);
    assert_eq!(engine.session().setup_elapsed_total_ms, 5_000);
    assert_eq!(engine.setup_laps()[0].rating, Rating::Good);
}

#[test]
fn corrupt_session_record_defaults_cleanly() {
    let store = Arc::new(MemoryStore::new());
    store.set("session", "definitely not json");
    store.set("current_label", "kept");

    let engine = PhaseTimer::load(Box::new(store));
    assert_eq!(engine.phase(), Phase::Ready);
    assert!(engine.setup_laps().is_empty());
    assert!(engine.heist_runs().is_empty());
    assert_eq!(engine.current_label(), "kept");
}

#[test]
fn failed_flags_are_recomputed_on_load() {
    let store = Arc::new(MemoryStore::new());
    // Two runs with the same label, both stored as not-failed.
    store.set(
        "session",
        r#"{"completedRuns":[
            {"label":"A","totalDurationMs":10000,"failed":false},
            {"label":"A","totalDurationMs":20000,"failed":false}
        ]}"#,
    );

    let engine = PhaseTimer::load(Box::new(store));
    let runs = engine.heist_runs();
    assert_eq!(runs.len(), 2);
    assert!(!runs[0].failed);
    assert!(runs[1].failed);
}

#[test]
fn forced_reset_clears_the_stored_attempt() {
    let store = Arc::new(MemoryStore::new());

    let mut engine = PhaseTimer::load(Box::new(store.clone()));
    engine.start_setup_at(T0);
    engine.complete_setup_at(T0 + 10_000);
    engine.reset_at(true, T0 + 20_000);
    drop(engine);

    let reloaded = PhaseTimer::load(Box::new(store));
    assert_eq!(reloaded.phase(), Phase::Ready);
    assert!(reloaded.setup_laps().is_empty());
    assert_eq!(reloaded.session().setup_elapsed_total_ms, 0);
}
