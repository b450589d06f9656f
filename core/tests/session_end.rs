//! Session termination tests.
//!
//! Tests cover: burnout, victory on the exact boundary, priority between
//! simultaneous conditions, the single end signal, cancelled countdowns,
//! opt-in collapse defeats, and that nothing moves after the end.

use governopoly_core::{
    catalog::EmailCatalog,
    clock::SessionPhase,
    config::SessionConfig,
    deadline::CountdownState,
    engine::SessionEngine,
    error::GameError,
    event::SessionEvent,
    report::PerformanceTier,
    termination::{DefeatReason, SessionOutcome},
};

fn quiet_config() -> SessionConfig {
    SessionConfig {
        regular_interval_min_ms:     1_000_000,
        regular_interval_max_ms:     1_000_000,
        urgent_probability_per_tick: 0.0,
        ..SessionConfig::default_test()
    }
}

fn started(session_id: &str, config: SessionConfig) -> SessionEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = SessionEngine::build_test_with(
        session_id.into(), 0x5EED, config, EmailCatalog::default_test(),
    )
    .expect("build test engine");
    engine.start().expect("start");
    engine
}

fn defeat(engine: &SessionEngine) -> Option<DefeatReason> {
    engine.report().and_then(|r| r.outcome.defeat_reason())
}

#[test]
fn full_inbox_is_burnout_at_the_next_tick() {
    let config = SessionConfig { max_inbox_capacity: 7, ..quiet_config() };
    let mut engine = started("end-burnout", config);
    engine.run_ticks(10).unwrap();

    for id in ["welcome", "reg_a", "reg_b", "reg_c", "reg_d", "reg_e"] {
        engine.deliver(id).unwrap();
    }
    engine.tick(100).unwrap();
    assert!(engine.clock.is_running(), "six of seven is not burnout");

    engine.deliver("reg_gated").unwrap();
    assert!(engine.clock.is_running(), "burnout is detected by the tick, not the delivery");

    engine.tick(100).unwrap();
    assert_eq!(defeat(&engine), Some(DefeatReason::Burnout));
    assert_eq!(engine.report().unwrap().headline(), "Email Overload!");
}

#[test]
fn surviving_the_full_length_is_victory() {
    let mut engine = started("end-victory", quiet_config());

    engine.run_ticks(1_799).unwrap();
    assert!(engine.clock.is_running(), "179.9s is not yet a victory");
    assert_eq!(engine.remaining_session_secs(), 0);

    engine.run_ticks(1_000).unwrap();
    assert_eq!(engine.clock.current_tick, 1_800, "run_ticks must stop at the end");
    assert_eq!(engine.elapsed_ms(), 180_000);

    let report = engine.report().expect("report");
    assert!(report.outcome.is_victory());
    assert_eq!(report.tier(), PerformanceTier::Difficult);
    assert_eq!(report.stats.cdo_budget, 1_000_000);
}

#[test]
fn burnout_outranks_victory_on_the_same_tick() {
    let config = SessionConfig { session_length_ms: 1_000, ..quiet_config() };
    let mut engine = started("end-simultaneous", config);
    engine.run_ticks(9).unwrap();
    for id in ["reg_a", "reg_b", "reg_c", "reg_d", "reg_e"] {
        engine.deliver(id).unwrap();
    }

    let events = engine.tick(100).unwrap();

    assert_eq!(defeat(&engine), Some(DefeatReason::Burnout));
    let ended = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::SessionEnded { .. }))
        .count();
    assert_eq!(ended, 1, "exactly one end signal");
}

#[test]
fn missed_deadline_outranks_victory_on_the_same_tick() {
    let mut engine = started("end-missed-at-whistle", quiet_config());
    engine.run_ticks(1_700).unwrap();
    engine.deliver("urgent_a").unwrap();

    engine.run_ticks(100).unwrap();

    assert_eq!(engine.elapsed_ms(), 180_000);
    assert_eq!(defeat(&engine), Some(DefeatReason::MissedUrgentDeadline));
}

#[test]
fn ending_cancels_running_countdowns() {
    let mut engine = started("end-cancel", quiet_config());
    engine.run_ticks(200).unwrap();
    for id in ["urgent_a", "reg_a", "reg_b", "reg_c", "reg_d"] {
        engine.deliver(id).unwrap();
    }
    engine.tick(100).unwrap();
    assert_eq!(defeat(&engine), Some(DefeatReason::Burnout));

    assert_eq!(engine.deadlines().outstanding(), 0);
    assert!(matches!(
        engine.deadlines().get("urgent_a").map(|c| c.state),
        Some(CountdownState::Cancelled { at_ms: 20_100 })
    ));
    assert_eq!(engine.urgent_remaining_secs("urgent_a"), None);
}

#[test]
fn nothing_changes_after_the_end() {
    let mut engine = started("end-frozen", quiet_config());
    engine.run_ticks(200).unwrap();
    for id in ["urgent_a", "reg_a", "reg_b", "reg_c", "reg_d"] {
        engine.deliver(id).unwrap();
    }
    engine.tick(100).unwrap();
    assert_eq!(engine.phase(), SessionPhase::Ended);
    assert!(engine.scheduler().is_halted());

    let snapshot = engine.snapshot();
    let resources = *engine.resources();
    let session_id = engine.session_id.clone();
    let logged = engine.store().events_for_session(&session_id).unwrap().len();

    // Well past the urgent deadline and the session length.
    for _ in 0..2_000 {
        assert!(engine.tick(100).unwrap().is_empty());
    }
    assert!(engine.apply_choice("reg_a", 1).is_ok());

    assert_eq!(engine.snapshot(), snapshot);
    assert_eq!(*engine.resources(), resources);
    assert_eq!(engine.store().events_for_session(&session_id).unwrap().len(), logged);
    assert_eq!(engine.store().event_count(&session_id, "session_ended").unwrap(), 1);
    assert_eq!(engine.store().event_count(&session_id, "urgent_deadline_missed").unwrap(), 0);
}

#[test]
fn collapse_defeats_are_opt_in() {
    let play = |session_id: &str, collapse_defeats: bool| {
        let config = SessionConfig { collapse_defeats, ..quiet_config() };
        let mut engine = started(session_id, config);
        for _ in 0..4 {
            engine.deliver("reg_a").unwrap();
            engine.apply_choice("reg_a", 2).unwrap();
        }
        assert_eq!(engine.resources().data_quality, 0);
        engine.tick(100).unwrap();
        engine
    };

    let off = play("end-collapse-off", false);
    assert!(off.clock.is_running(), "collapse is not a defeat by default");

    let on = play("end-collapse-on", true);
    assert_eq!(defeat(&on), Some(DefeatReason::DataQualityCollapse));
}

#[test]
fn lifecycle_commands_check_the_phase() {
    let mut engine = SessionEngine::build_test_with(
        "end-phases".into(), 1, quiet_config(), EmailCatalog::default_test(),
    )
    .unwrap();

    assert!(engine.tick(100).unwrap().is_empty(), "Ready sessions do not tick");
    assert!(matches!(
        engine.pause(),
        Err(GameError::InvalidPhase { expected: SessionPhase::Running, actual: SessionPhase::Ready })
    ));
    assert!(matches!(engine.deliver("reg_a"), Err(GameError::InvalidPhase { .. })));

    engine.start().unwrap();
    assert!(engine.start().is_err(), "a session starts once");
    engine.pause().unwrap();
    assert!(engine.pause().is_err());
    engine.resume().unwrap();
    assert!(matches!(
        engine.deliver("no_such_template"),
        Err(GameError::TemplateNotFound { .. })
    ));
}

#[test]
fn victory_report_is_persisted() {
    let mut engine = started("end-report", quiet_config());
    engine.run_ticks(2_000).unwrap();

    let stored = engine.store().load_report("end-report").unwrap();
    assert_eq!(stored.as_ref(), engine.report());
    assert_eq!(
        stored.map(|r| r.outcome),
        Some(SessionOutcome::Victory)
    );
}
