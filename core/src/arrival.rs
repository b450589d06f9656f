//! Arrival scheduler: decides, once per tick, whether new email lands.
//!
//! ORDER within one update (fixed):
//!   1. Welcome email   one-shot, forced, no eligibility or randomness
//!   2. Regular email   when the gap since the last one exceeds a rolled threshold
//!   3. Urgent email    Bernoulli trial, gated by elapsed time and by
//!                      "no urgent countdown already running"
//!
//! Candidates are drawn uniformly from the eligible pool in catalog order.
//! An empty eligible pool triggers one replenish and one retry.

use crate::{
    catalog::{EmailCatalog, EmailTemplate},
    config::SessionConfig,
    deadline::UrgentDeadlineTracker,
    event::{NotificationCue, SessionEvent},
    inbox::DeliveredEmail,
    rng::{RngBank, SubsystemRng, SubsystemSlot},
    state::SessionState,
    types::{Millis, Tick},
};

/// Everything the scheduler reads but never writes.
pub struct ArrivalContext<'a> {
    pub tick:     Tick,
    pub now_ms:   Millis,
    pub delta_ms: Millis,
    pub config:   &'a SessionConfig,
    pub catalog:  &'a EmailCatalog,
    pub rng_bank: &'a RngBank,
}

#[derive(Debug, Clone, Default)]
pub struct ArrivalScheduler {
    last_regular_ms:     Millis,
    next_regular_gap_ms: Option<Millis>,
    welcome_delivered:   bool,
    halted:              bool,
}

impl ArrivalScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop for good. Later updates deliver nothing.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn welcome_delivered(&self) -> bool {
        self.welcome_delivered
    }

    /// Record that the welcome email reached the inbox by another path,
    /// so the scheduler never sends it again.
    pub fn mark_welcome_delivered(&mut self) {
        self.welcome_delivered = true;
    }

    /// The regular-arrival threshold currently in force, once rolled.
    pub fn next_regular_gap_ms(&self) -> Option<Millis> {
        self.next_regular_gap_ms
    }

    pub fn update(
        &mut self,
        ctx:       &ArrivalContext<'_>,
        state:     &mut SessionState,
        deadlines: &mut UrgentDeadlineTracker,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.halted {
            return events;
        }

        self.deliver_welcome(ctx, state, deadlines, &mut events);

        let mut regular_rng = ctx.rng_bank.for_subsystem_at_tick(SubsystemSlot::RegularArrival, ctx.tick);
        self.deliver_regular(ctx, state, deadlines, &mut regular_rng, &mut events);

        let mut urgent_rng = ctx.rng_bank.for_subsystem_at_tick(SubsystemSlot::UrgentArrival, ctx.tick);
        self.deliver_urgent(ctx, state, deadlines, &mut urgent_rng, &mut events);

        events
    }

    fn deliver_welcome(
        &mut self,
        ctx:       &ArrivalContext<'_>,
        state:     &mut SessionState,
        deadlines: &mut UrgentDeadlineTracker,
        events:    &mut Vec<SessionEvent>,
    ) {
        if self.welcome_delivered || ctx.now_ms < ctx.config.welcome_delay_ms {
            return;
        }
        let Some(welcome_id) = ctx.config.welcome_email_id.as_deref() else {
            return;
        };
        self.welcome_delivered = true;

        let Some(template) = ctx.catalog.get(welcome_id) else {
            log::warn!("welcome template '{welcome_id}' missing from catalog; skipped");
            return;
        };
        let delivered = deliver(template, ctx.now_ms, ctx.config.urgent_countdown_ms, true, state, deadlines);
        if !delivered.is_empty() {
            self.last_regular_ms = ctx.now_ms;
            self.next_regular_gap_ms = None;
            log::debug!("t={}ms welcome email '{welcome_id}' delivered", ctx.now_ms);
        }
        events.extend(delivered);
    }

    fn deliver_regular(
        &mut self,
        ctx:       &ArrivalContext<'_>,
        state:     &mut SessionState,
        deadlines: &mut UrgentDeadlineTracker,
        rng:       &mut SubsystemRng,
        events:    &mut Vec<SessionEvent>,
    ) {
        let config = ctx.config;
        let gap_ms = *self.next_regular_gap_ms.get_or_insert_with(|| {
            rng.range_inclusive(config.regular_interval_min_ms, config.regular_interval_max_ms)
        });
        let since_last = ctx.now_ms.saturating_sub(self.last_regular_ms);
        if since_last <= gap_ms {
            return;
        }

        let Some(template) = draw(ctx, state, false, rng, events) else {
            log::debug!("t={}ms no eligible regular email; retrying next tick", ctx.now_ms);
            return;
        };
        events.extend(deliver(template, ctx.now_ms, config.urgent_countdown_ms, false, state, deadlines));
        self.last_regular_ms = ctx.now_ms;
        self.next_regular_gap_ms = None;
        log::debug!(
            "t={}ms regular email '{}' delivered after {since_last}ms (threshold {gap_ms}ms)",
            ctx.now_ms,
            template.id
        );
    }

    fn deliver_urgent(
        &mut self,
        ctx:       &ArrivalContext<'_>,
        state:     &mut SessionState,
        deadlines: &mut UrgentDeadlineTracker,
        rng:       &mut SubsystemRng,
        events:    &mut Vec<SessionEvent>,
    ) {
        let config = ctx.config;
        if ctx.now_ms < config.urgent_min_elapsed_ms || deadlines.has_outstanding() {
            return;
        }
        let p = urgent_chance(config.urgent_probability_per_tick, ctx.delta_ms, config.tick_interval_ms);
        if !rng.chance(p) {
            return;
        }

        let Some(template) = draw(ctx, state, true, rng, events) else {
            return;
        };
        events.extend(deliver(template, ctx.now_ms, config.urgent_countdown_ms, false, state, deadlines));
        log::debug!("t={}ms urgent email '{}' delivered", ctx.now_ms, template.id);
    }
}

/// Per-tick urgent probability scaled to the actual tick length, so the
/// arrival rate per second of play does not depend on tick jitter.
pub fn urgent_chance(p_per_tick: f64, delta_ms: Millis, tick_interval_ms: Millis) -> f64 {
    if delta_ms == 0 || tick_interval_ms == 0 || p_per_tick <= 0.0 {
        return 0.0;
    }
    if delta_ms == tick_interval_ms {
        return p_per_tick;
    }
    let ticks = delta_ms as f64 / tick_interval_ms as f64;
    1.0 - (1.0 - p_per_tick.min(1.0)).powf(ticks)
}

/// Put a template into the inbox and withdraw it from the pool. Urgent
/// templates also get a countdown. Returns no events if the template is
/// already in the inbox.
pub fn deliver(
    template:     &EmailTemplate,
    now_ms:       Millis,
    countdown_ms: Millis,
    one_shot:     bool,
    state:        &mut SessionState,
    deadlines:    &mut UrgentDeadlineTracker,
) -> Vec<SessionEvent> {
    let email = DeliveredEmail {
        template_id:     template.id.clone(),
        delivered_at_ms: now_ms,
        is_urgent:       template.is_urgent,
    };
    if !state.inbox.push(email.clone()) {
        log::debug!("t={now_ms}ms '{}' already in inbox; not delivered twice", template.id);
        return Vec::new();
    }
    state.pool.withdraw(&template.id, one_shot);
    state.emails_delivered += 1;

    let mut events = vec![SessionEvent::EmailDelivered {
        cue: NotificationCue::for_email(&email),
        email,
    }];
    if template.is_urgent {
        let countdown = deadlines.start(&template.id, now_ms, countdown_ms);
        events.push(SessionEvent::UrgentCountdownStarted {
            email_id:    template.id.clone(),
            deadline_ms: countdown.deadline_ms(),
        });
    }
    events
}

/// Uniform pick among eligible, available templates of one kind. The
/// welcome template is never drawn; only `deliver_welcome` sends it.
fn draw<'c>(
    ctx:    &ArrivalContext<'c>,
    state:  &mut SessionState,
    urgent: bool,
    rng:    &mut SubsystemRng,
    events: &mut Vec<SessionEvent>,
) -> Option<&'c EmailTemplate> {
    let now_ms = ctx.now_ms;
    let welcome = ctx.config.welcome_email_id.as_deref();
    let mut candidates = candidates(ctx.catalog, state, urgent, welcome);
    if candidates.is_empty() && state.pool.replenish(state.inbox.ids()) {
        log::debug!(
            "t={now_ms}ms eligible {} pool empty; pool replenished",
            if urgent { "urgent" } else { "regular" }
        );
        events.push(SessionEvent::PoolReplenished {
            elapsed_ms:      now_ms,
            replenish_count: state.pool.replenish_count(),
        });
        candidates = self::candidates(ctx.catalog, state, urgent, welcome);
    }
    let index = rng.pick_index(candidates.len())?;
    Some(candidates[index])
}

fn candidates<'c>(
    catalog: &'c EmailCatalog,
    state:   &SessionState,
    urgent:  bool,
    welcome: Option<&str>,
) -> Vec<&'c EmailTemplate> {
    let r = &state.resources;
    catalog
        .eligible_pool(r.reputation, r.data_quality, state.pool.excluded())
        .into_iter()
        .filter(|t| t.is_urgent == urgent && welcome != Some(t.id.as_str()))
        .collect()
}
