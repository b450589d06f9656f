//! The session engine: the heart of Governopoly.
//!
//! EXECUTION ORDER per tick (fixed, documented, never reordered):
//!   1. Clock        advance by the measured wall-clock delta
//!   2. Deadlines    expire due urgent countdowns; an expiry evaluates
//!                   termination immediately and ends the tick
//!   3. Arrivals     welcome, regular, urgent (see arrival.rs)
//!   4. Termination  fixed priority order (see termination.rs)
//!
//! RULES:
//!   - All mutable session state is owned here. Nothing reads a stale copy.
//!   - Ticks and choices are both `&mut self`, so they can never interleave.
//!   - Ending the session halts arrivals and cancels every countdown in the
//!     same call that emits `SessionEnded`. Nothing mutates after that.
//!   - Every event is journaled and fanned out to observers before the
//!     call that produced it returns.

use crate::{
    arrival::{self, ArrivalContext, ArrivalScheduler},
    catalog::EmailCatalog,
    clock::{SessionClock, SessionPhase},
    command::PlayerCommand,
    config::SessionConfig,
    deadline::UrgentDeadlineTracker,
    error::{GameError, GameResult},
    event::{EventLogEntry, SessionEvent},
    observer::SessionObserver,
    report::SessionReport,
    resources::{ChoiceAvailability, OutcomeImpact, ResourceState},
    rng::RngBank,
    snapshot::{InboxEntry, SessionSnapshot, SNAPSHOT_INTERVAL},
    state::SessionState,
    store::SessionStore,
    termination::{Checkpoint, SessionOutcome, TerminationEvaluator},
    types::{ChoiceId, EmailId, Millis, SessionId, Tick},
};
use serde::{Deserialize, Serialize};

/// What the player sees after answering an email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceReceipt {
    pub email_id:        EmailId,
    pub choice_id:       ChoiceId,
    pub description:     String,
    /// Raw authored impacts, before clamping.
    pub impact:          OutcomeImpact,
    pub resources_after: ResourceState,
    pub answered_urgent: bool,
    /// Set when this choice ended the session.
    pub ended:           Option<SessionOutcome>,
}

/// Why a choice was dropped without touching any state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    SessionNotRunning,
    EmailNotInInbox,
    UnknownChoice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceResolution {
    Applied(ChoiceReceipt),
    Ignored(IgnoreReason),
}

pub struct SessionEngine {
    pub session_id: SessionId,
    pub clock:      SessionClock,
    pub rng_bank:   RngBank,
    seed:           u64,
    config:         SessionConfig,
    catalog:        EmailCatalog,
    state:          SessionState,
    scheduler:      ArrivalScheduler,
    deadlines:      UrgentDeadlineTracker,
    termination:    TerminationEvaluator,
    report:         Option<SessionReport>,
    store:          SessionStore,
    observers:      Vec<Box<dyn SessionObserver>>,
}

impl SessionEngine {
    /// Validate inputs and register the session in the journal.
    /// The store must already be migrated.
    pub fn new(
        session_id: SessionId,
        seed:       u64,
        config:     SessionConfig,
        catalog:    EmailCatalog,
        store:      SessionStore,
    ) -> GameResult<Self> {
        config.validate()?;
        if catalog.is_empty() {
            return Err(GameError::Catalog("catalog has no templates".into()));
        }
        if let Some(welcome_id) = &config.welcome_email_id {
            if !catalog.contains(welcome_id) {
                return Err(GameError::TemplateNotFound { id: welcome_id.clone() });
            }
        }
        store.insert_session(&session_id, seed, env!("CARGO_PKG_VERSION"), &config.company_name)?;

        log::info!(
            "session {session_id} ready: seed={seed} templates={} length={}ms inbox_cap={}",
            catalog.len(),
            config.session_length_ms,
            config.max_inbox_capacity
        );

        Ok(Self {
            clock:       SessionClock::new(session_id.clone()),
            rng_bank:    RngBank::new(seed),
            seed,
            state:       SessionState::new(&config),
            scheduler:   ArrivalScheduler::new(),
            deadlines:   UrgentDeadlineTracker::new(),
            termination: TerminationEvaluator::new(&config),
            report:      None,
            observers:   Vec::new(),
            session_id,
            config,
            catalog,
            store,
        })
    }

    /// Engine over an in-memory journal, the test config, and the test catalog.
    pub fn build_test(session_id: SessionId, seed: u64) -> GameResult<Self> {
        Self::build_test_with(
            session_id,
            seed,
            SessionConfig::default_test(),
            EmailCatalog::default_test(),
        )
    }

    pub fn build_test_with(
        session_id: SessionId,
        seed:       u64,
        config:     SessionConfig,
        catalog:    EmailCatalog,
    ) -> GameResult<Self> {
        let store = SessionStore::in_memory()?;
        store.migrate()?;
        Self::new(session_id, seed, config, catalog, store)
    }

    pub fn add_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    // ── Lifecycle ──────────────────────────────────────────────

    pub fn start(&mut self) -> GameResult<Vec<SessionEvent>> {
        self.require_phase(SessionPhase::Ready)?;
        self.clock.start();
        log::info!("session {} started", self.session_id);
        let events = vec![SessionEvent::SessionStarted {
            session_id: self.session_id.clone(),
            seed:       self.seed,
        }];
        self.record(0, &events)?;
        Ok(events)
    }

    pub fn pause(&mut self) -> GameResult<Vec<SessionEvent>> {
        self.require_phase(SessionPhase::Running)?;
        self.clock.pause();
        let events = vec![SessionEvent::SessionPaused { elapsed_ms: self.clock.elapsed_ms }];
        self.record(self.clock.current_tick, &events)?;
        Ok(events)
    }

    pub fn resume(&mut self) -> GameResult<Vec<SessionEvent>> {
        self.require_phase(SessionPhase::Paused)?;
        self.clock.resume();
        let events = vec![SessionEvent::SessionResumed { elapsed_ms: self.clock.elapsed_ms }];
        self.record(self.clock.current_tick, &events)?;
        Ok(events)
    }

    // ── Tick ───────────────────────────────────────────────────

    /// Advance the session by `delta_ms` of wall-clock time.
    /// Outside the Running phase this is a no-op.
    pub fn tick(&mut self, delta_ms: Millis) -> GameResult<Vec<SessionEvent>> {
        if !self.clock.is_running() {
            log::trace!("tick ignored: session is {:?}", self.clock.phase);
            return Ok(Vec::new());
        }

        let tick = self.clock.advance(delta_ms);
        let now = self.clock.elapsed_ms;
        let mut events = Vec::new();

        let expired = self.deadlines.expire_due(now);
        if !expired.is_empty() {
            for countdown in &expired {
                self.state.inbox.remove(&countdown.email_id);
                log::warn!(
                    "tick={tick} t={now}ms urgent email '{}' missed its {}ms deadline",
                    countdown.email_id,
                    countdown.deadline_ms()
                );
                events.push(SessionEvent::UrgentDeadlineMissed {
                    email_id:    countdown.email_id.clone(),
                    deadline_ms: countdown.deadline_ms(),
                });
            }
            if let Some(outcome) =
                self.termination.evaluate(Checkpoint::DeadlineExpired, &self.state, now, true)
            {
                self.halt(outcome, &mut events);
            }
            self.record(tick, &events)?;
            return Ok(events);
        }

        let ctx = ArrivalContext {
            tick,
            now_ms: now,
            delta_ms,
            config: &self.config,
            catalog: &self.catalog,
            rng_bank: &self.rng_bank,
        };
        events.extend(self.scheduler.update(&ctx, &mut self.state, &mut self.deadlines));

        if let Some(outcome) = self.termination.evaluate(Checkpoint::Tick, &self.state, now, false) {
            self.halt(outcome, &mut events);
        }

        if tick % SNAPSHOT_INTERVAL == 0 {
            self.take_snapshot(tick)?;
        }
        self.record(tick, &events)?;
        Ok(events)
    }

    /// Run up to `n` ticks of the configured interval, stopping early if
    /// the session ends. Used by tests and batch runs.
    pub fn run_ticks(&mut self, n: u64) -> GameResult<Vec<SessionEvent>> {
        let interval = self.config.tick_interval_ms;
        let mut events = Vec::new();
        for _ in 0..n {
            if !self.clock.is_running() {
                break;
            }
            events.extend(self.tick(interval)?);
        }
        Ok(events)
    }

    // ── Player input ───────────────────────────────────────────

    pub fn submit(&mut self, command: PlayerCommand) -> GameResult<Vec<SessionEvent>> {
        match command {
            PlayerCommand::Start => self.start(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::Resume => self.resume(),
            PlayerCommand::Choose { email_id, choice_id } => {
                let (resolution, events) = self.resolve_choice(&email_id, choice_id)?;
                if let ChoiceResolution::Ignored(reason) = resolution {
                    log::warn!("choose {email_id}/{choice_id} dropped: {reason:?}");
                }
                Ok(events)
            }
        }
    }

    /// Apply the player's choice for an email in the inbox. Anything that
    /// no longer matches the current state is ignored, never an error.
    pub fn apply_choice(&mut self, email_id: &str, choice_id: ChoiceId) -> GameResult<ChoiceResolution> {
        self.resolve_choice(email_id, choice_id).map(|(resolution, _)| resolution)
    }

    fn resolve_choice(
        &mut self,
        email_id:  &str,
        choice_id: ChoiceId,
    ) -> GameResult<(ChoiceResolution, Vec<SessionEvent>)> {
        if !self.clock.is_running() {
            return ignored(IgnoreReason::SessionNotRunning);
        }
        if !self.state.inbox.contains(email_id) {
            return ignored(IgnoreReason::EmailNotInInbox);
        }
        let Some(outcome) = self
            .catalog
            .get(email_id)
            .and_then(|t| t.choice(choice_id))
            .map(|c| c.outcome.clone())
        else {
            return ignored(IgnoreReason::UnknownChoice);
        };

        let tick = self.clock.current_tick;
        let now = self.clock.elapsed_ms;
        let mut events = Vec::new();

        let impact = self.state.resources.apply(&outcome);
        self.state.inbox.remove(email_id);
        self.state.answered.insert(email_id.to_string());
        self.state.emails_answered += 1;

        let remaining_ms = self.deadlines.get(email_id).map(|c| c.remaining_ms(now)).unwrap_or(0);
        let answered_urgent = self.deadlines.answer(email_id, now);
        if answered_urgent {
            events.push(SessionEvent::UrgentCountdownAnswered {
                email_id: email_id.to_string(),
                elapsed_ms: now,
                remaining_ms,
            });
        }

        let resources_after = self.state.resources;
        events.push(SessionEvent::ChoiceApplied {
            elapsed_ms:      now,
            email_id:        email_id.to_string(),
            choice_id,
            description:     outcome.description.clone(),
            impact,
            resources_after,
        });
        log::debug!(
            "t={now}ms '{email_id}' answered with choice {choice_id}: budget={} profit={} dq={} rep={}",
            resources_after.budget,
            resources_after.profit,
            resources_after.data_quality,
            resources_after.reputation
        );

        let ended = self.termination.evaluate(Checkpoint::Choice, &self.state, now, false);
        if let Some(session_outcome) = ended {
            self.halt(session_outcome, &mut events);
        }

        let receipt = ChoiceReceipt {
            email_id: email_id.to_string(),
            choice_id,
            description: outcome.description,
            impact,
            resources_after,
            answered_urgent,
            ended,
        };
        for observer in &mut self.observers {
            observer.on_choice_applied(&receipt);
        }
        self.record(tick, &events)?;
        Ok((ChoiceResolution::Applied(receipt), events))
    }

    /// Force a template into the inbox, bypassing eligibility and timing.
    /// Delivering a template that is already in the inbox is a no-op.
    pub fn deliver(&mut self, template_id: &str) -> GameResult<Vec<SessionEvent>> {
        self.require_phase(SessionPhase::Running)?;
        let template = self
            .catalog
            .get(template_id)
            .ok_or_else(|| GameError::TemplateNotFound { id: template_id.to_string() })?;
        let one_shot = self.config.welcome_email_id.as_deref() == Some(template_id);
        let events = arrival::deliver(
            template,
            self.clock.elapsed_ms,
            self.config.urgent_countdown_ms,
            one_shot,
            &mut self.state,
            &mut self.deadlines,
        );
        if one_shot && !events.is_empty() {
            self.scheduler.mark_welcome_delivered();
        }
        self.record(self.clock.current_tick, &events)?;
        Ok(events)
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.clock.phase
    }

    pub fn elapsed_ms(&self) -> Millis {
        self.clock.elapsed_ms
    }

    pub fn remaining_session_ms(&self) -> Millis {
        self.clock.remaining_ms(self.config.session_length_ms)
    }

    pub fn remaining_session_secs(&self) -> u64 {
        self.clock.remaining_secs(self.config.session_length_ms)
    }

    /// Whole seconds left on an urgent email; `None` if nothing is running for it.
    pub fn urgent_remaining_secs(&self, email_id: &str) -> Option<u64> {
        self.deadlines.remaining_secs(email_id, self.clock.elapsed_ms)
    }

    /// Enabled/disabled state of each choice; `None` if the email is not in the inbox.
    pub fn choice_availability(&self, email_id: &str) -> Option<Vec<ChoiceAvailability>> {
        if !self.state.inbox.contains(email_id) {
            return None;
        }
        let template = self.catalog.get(email_id)?;
        Some(template.choices.iter().map(|c| self.state.resources.availability(c)).collect())
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn resources(&self) -> &ResourceState {
        &self.state.resources
    }

    pub fn deadlines(&self) -> &UrgentDeadlineTracker {
        &self.deadlines
    }

    pub fn scheduler(&self) -> &ArrivalScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &EmailCatalog {
        &self.catalog
    }

    pub fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Query journaled events for a specific tick.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_tick(&self, session_id: &str, tick: Tick) -> GameResult<Vec<EventLogEntry>> {
        self.store.events_for_tick(session_id, tick)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let now = self.clock.elapsed_ms;
        let company = &self.config.company_name;
        let inbox = self
            .state
            .inbox
            .most_recent_first()
            .filter_map(|email| {
                let template = self.catalog.get(&email.template_id)?;
                Some(InboxEntry {
                    email_id:              email.template_id.clone(),
                    sender:                template.sender.clone(),
                    title:                 template.title.clone(),
                    category:              template.category,
                    preview:               template.preview(company),
                    delivered_at_ms:       email.delivered_at_ms,
                    is_urgent:             email.is_urgent,
                    urgent_remaining_secs: self.deadlines.remaining_secs(&email.template_id, now),
                })
            })
            .collect();

        SessionSnapshot {
            session_id:     self.session_id.clone(),
            phase:          self.clock.phase,
            tick:           self.clock.current_tick,
            elapsed_ms:     now,
            remaining_secs: self.remaining_session_secs(),
            stats:          self.state.resources.stats(),
            inbox_capacity: self.state.inbox.capacity(),
            inbox,
            outcome:        self.termination.outcome(),
        }
    }

    // ── Internals ──────────────────────────────────────────────

    fn require_phase(&self, expected: SessionPhase) -> GameResult<()> {
        if self.clock.phase != expected {
            return Err(GameError::InvalidPhase { expected, actual: self.clock.phase });
        }
        Ok(())
    }

    /// End the session. Idempotent: a second call does nothing.
    fn halt(&mut self, outcome: SessionOutcome, events: &mut Vec<SessionEvent>) {
        if self.clock.is_ended() {
            return;
        }
        let now = self.clock.elapsed_ms;
        self.clock.end();
        self.scheduler.halt();
        let cancelled = self.deadlines.cancel_all(now);

        let report = SessionReport {
            session_id:       self.session_id.clone(),
            outcome,
            stats:            self.state.resources.stats(),
            elapsed_ms:       now,
            emails_delivered: self.state.emails_delivered,
            emails_answered:  self.state.emails_answered,
        };
        match outcome {
            SessionOutcome::Victory => log::info!(
                "session {} won at {now}ms: profit={} budget={}",
                self.session_id,
                report.stats.company_profit,
                report.stats.cdo_budget
            ),
            SessionOutcome::Defeat { reason } => log::warn!(
                "session {} lost at {now}ms: {reason:?} (cancelled {cancelled} countdowns)",
                self.session_id
            ),
        }

        self.report = Some(report.clone());
        events.push(SessionEvent::SessionEnded { report });
    }

    /// Journal events and notify observers. The final report is saved
    /// after observers have heard the end.
    fn record(&mut self, tick: Tick, events: &[SessionEvent]) -> GameResult<()> {
        for event in events {
            let entry = EventLogEntry {
                id:         None,
                session_id: self.session_id.clone(),
                tick,
                elapsed_ms: self.clock.elapsed_ms,
                event_type: event.type_name().to_string(),
                payload:    serde_json::to_string(event)?,
            };
            self.store.append_event(&entry)?;

            match event {
                SessionEvent::EmailDelivered { email, cue } => {
                    for observer in &mut self.observers {
                        observer.on_email_delivered(email, *cue);
                    }
                }
                SessionEvent::SessionEnded { report } => {
                    for observer in &mut self.observers {
                        observer.on_session_ended(report);
                    }
                    self.store.save_report(report)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn take_snapshot(&self, tick: Tick) -> GameResult<()> {
        let json = serde_json::to_string(&self.snapshot())?;
        self.store.save_snapshot(&self.session_id, tick, &json)?;
        log::debug!("Snapshot saved at tick {tick}");
        Ok(())
    }
}

fn ignored(reason: IgnoreReason) -> GameResult<(ChoiceResolution, Vec<SessionEvent>)> {
    Ok((ChoiceResolution::Ignored(reason), Vec::new()))
}
