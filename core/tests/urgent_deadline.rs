//! Urgent deadline tests.
//!
//! Tests cover: expiry removes the email and ends the session, answering
//! in time stops the countdown, large and uneven tick deltas, pausing,
//! and natural urgent arrivals (gating, one outstanding at a time).

use governopoly_core::{
    catalog::EmailCatalog,
    config::SessionConfig,
    deadline::CountdownState,
    engine::{ChoiceResolution, SessionEngine},
    event::{NotificationCue, SessionEvent},
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
        session_id.into(), 0xABCD, config, EmailCatalog::default_test(),
    )
    .expect("build test engine");
    engine.start().expect("start");
    engine
}

fn missed(events: &[SessionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::UrgentDeadlineMissed { email_id, .. } => Some(email_id.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn unanswered_urgent_email_expires_and_ends_the_session() {
    let mut engine = started("urgent-expiry", quiet_config());
    engine.run_ticks(200).unwrap();
    assert_eq!(engine.elapsed_ms(), 20_000);

    let events = engine.deliver("urgent_a").unwrap();
    assert!(matches!(
        events.as_slice(),
        [
            SessionEvent::EmailDelivered { cue: NotificationCue::Urgent, .. },
            SessionEvent::UrgentCountdownStarted { deadline_ms: 30_000, .. },
        ]
    ), "unexpected delivery events: {events:?}");
    assert_eq!(engine.urgent_remaining_secs("urgent_a"), Some(10));

    // One millisecond short of the deadline: still alive.
    engine.tick(9_999).unwrap();
    assert_eq!(engine.urgent_remaining_secs("urgent_a"), Some(0));
    assert!(engine.clock.is_running());
    assert!(engine.state().inbox.contains("urgent_a"));

    let events = engine.tick(2).unwrap();
    assert_eq!(missed(&events), vec!["urgent_a".to_string()]);
    assert!(!engine.state().inbox.contains("urgent_a"), "expired email must leave the inbox");
    assert!(engine.snapshot().inbox.iter().all(|e| e.email_id != "urgent_a"));

    let report = engine.report().expect("session should have ended");
    assert_eq!(
        report.outcome,
        SessionOutcome::Defeat { reason: DefeatReason::MissedUrgentDeadline }
    );
    assert_eq!(report.elapsed_ms, 30_001);
}

#[test]
fn answering_before_the_deadline_stops_the_countdown() {
    let mut engine = started("urgent-answered", quiet_config());
    engine.run_ticks(200).unwrap();
    engine.deliver("urgent_b").unwrap();
    engine.run_ticks(90).unwrap();

    let resolution = engine.apply_choice("urgent_b", 3).unwrap();
    match resolution {
        ChoiceResolution::Applied(receipt) => assert!(receipt.answered_urgent),
        other => panic!("expected the choice to apply, got {other:?}"),
    }
    assert_eq!(engine.urgent_remaining_secs("urgent_b"), None);
    assert!(matches!(
        engine.deadlines().get("urgent_b").map(|c| c.state),
        Some(CountdownState::Answered { at_ms: 29_000 })
    ));

    let events = engine.run_ticks(300).unwrap();
    assert!(missed(&events).is_empty(), "answered email must never expire");
    assert!(engine.clock.is_running());
}

#[test]
fn expiry_is_exact_under_large_tick_deltas() {
    let mut engine = started("urgent-jitter", quiet_config());
    engine.tick(16_000).unwrap();
    engine.deliver("urgent_a").unwrap();

    for expected_secs in [7, 4, 1] {
        engine.tick(3_000).unwrap();
        assert_eq!(engine.urgent_remaining_secs("urgent_a"), Some(expected_secs));
    }

    let events = engine.tick(3_000).unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::UrgentDeadlineMissed { deadline_ms: 26_000, .. }
    )), "deadline is fixed at delivery + countdown: {events:?}");
    assert_eq!(
        engine.deadlines().get("urgent_a").map(|c| c.state),
        Some(CountdownState::Expired { at_ms: 26_000 })
    );
}

#[test]
fn pausing_freezes_the_countdown() {
    let mut engine = started("urgent-pause", quiet_config());
    engine.run_ticks(200).unwrap();
    engine.deliver("urgent_a").unwrap();
    engine.tick(4_000).unwrap();
    engine.pause().unwrap();

    for _ in 0..50 {
        assert!(engine.tick(1_000).unwrap().is_empty(), "paused ticks do nothing");
    }
    assert_eq!(engine.elapsed_ms(), 24_000);
    assert_eq!(engine.urgent_remaining_secs("urgent_a"), Some(6));

    engine.resume().unwrap();
    engine.tick(5_000).unwrap();
    assert!(engine.clock.is_running());
    engine.tick(1_000).unwrap();
    assert!(engine.report().is_some(), "countdown resumes where it stopped");
}

#[test]
fn urgent_arrivals_wait_for_the_minimum_elapsed_time() {
    let config = SessionConfig { urgent_probability_per_tick: 1.0, ..quiet_config() };
    let mut engine = started("urgent-gate", config);

    let events = engine.run_ticks(149).unwrap();
    assert!(
        !events.iter().any(|e| matches!(e, SessionEvent::EmailDelivered { .. })),
        "nothing urgent before 15s"
    );

    let events = engine.tick(100).unwrap();
    assert_eq!(engine.elapsed_ms(), 15_000);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::EmailDelivered { cue: NotificationCue::Urgent, .. }
    )));
    assert_eq!(engine.deadlines().outstanding(), 1);
}

#[test]
fn only_one_urgent_countdown_runs_at_a_time() {
    let config = SessionConfig { urgent_probability_per_tick: 1.0, ..quiet_config() };
    let mut engine = started("urgent-single", config);
    engine.run_ticks(150).unwrap();
    assert_eq!(engine.state().inbox.len(), 1);

    engine.run_ticks(50).unwrap();
    assert_eq!(engine.state().inbox.len(), 1, "no second urgent while one is running");
    assert_eq!(engine.deadlines().outstanding(), 1);

    let mut delivered = Vec::new();
    let mut replenished = false;
    for _ in 0..4 {
        let current = engine.state().inbox.ids().next().cloned().expect("one urgent email");
        delivered.push(current.clone());
        engine.apply_choice(&current, 3).unwrap();
        let events = engine.tick(100).unwrap();
        replenished |= events.iter().any(|e| matches!(e, SessionEvent::PoolReplenished { .. }));
    }

    assert!(delivered.iter().all(|id| id.starts_with("urgent_")), "{delivered:?}");
    assert_ne!(delivered[0], delivered[1], "pool must not offer a withdrawn template");
    assert!(replenished, "two urgent templates cannot last four draws without a replenish");
    assert!(engine.clock.is_running());
}
