//! Termination evaluator.
//!
//! PRIORITY (fixed; the first match wins):
//!   1. Burnout            inbox size >= capacity
//!   2. Budget depletion   budget <= 0
//!   3. Collapse           data quality or reputation at 0 (opt-in)
//!   4. Missed urgent      signalled by the deadline tracker
//!   5. Victory            elapsed >= session length
//!
//! The evaluator latches: once it has returned an outcome it returns
//! `None` forever, so a stray late check can never end a session twice.

use crate::{config::SessionConfig, resources::METRIC_MIN, state::SessionState, types::Millis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DefeatReason {
    Burnout,
    BudgetDepletion,
    DataQualityCollapse,
    ReputationCollapse,
    MissedUrgentDeadline,
}

impl DefeatReason {
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Burnout => "Email Overload!",
            Self::BudgetDepletion => "Budget Crisis!",
            Self::DataQualityCollapse => "Data Quality Disaster!",
            Self::ReputationCollapse => "Reputation Ruined!",
            Self::MissedUrgentDeadline => "Data Breach Crisis!",
        }
    }

    /// Code used by the leaderboard's `defeat` field.
    pub fn legacy_code(&self) -> &'static str {
        match self {
            Self::Burnout => "burnout",
            Self::BudgetDepletion => "budget",
            Self::DataQualityCollapse => "dataQuality",
            Self::ReputationCollapse => "reputation",
            Self::MissedUrgentDeadline => "dataBreach",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SessionOutcome {
    Victory,
    Defeat { reason: DefeatReason },
}

impl SessionOutcome {
    pub fn is_victory(&self) -> bool {
        matches!(self, Self::Victory)
    }

    pub fn defeat_reason(&self) -> Option<DefeatReason> {
        match self {
            Self::Victory => None,
            Self::Defeat { reason } => Some(*reason),
        }
    }
}

/// What triggered this evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// End of a scheduler tick, after arrivals.
    Tick,
    /// An urgent countdown just expired, before any arrivals this tick.
    DeadlineExpired,
    /// A choice was just applied.
    Choice,
}

#[derive(Debug, Clone)]
pub struct TerminationEvaluator {
    session_length_ms:         Millis,
    immediate_resource_defeat: bool,
    collapse_defeats:          bool,
    fired:                     Option<SessionOutcome>,
}

impl TerminationEvaluator {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            session_length_ms:         config.session_length_ms,
            immediate_resource_defeat: config.immediate_resource_defeat,
            collapse_defeats:          config.collapse_defeats,
            fired:                     None,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.is_some()
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.fired
    }

    /// Check every end condition in priority order. Returns the outcome the
    /// first time one matches, and `None` on every call after that.
    pub fn evaluate(
        &mut self,
        checkpoint:    Checkpoint,
        state:         &SessionState,
        elapsed_ms:    Millis,
        missed_urgent: bool,
    ) -> Option<SessionOutcome> {
        if self.fired.is_some() {
            return None;
        }
        let outcome = self.first_match(checkpoint, state, elapsed_ms, missed_urgent)?;
        self.fired = Some(outcome);
        Some(outcome)
    }

    fn first_match(
        &self,
        checkpoint:    Checkpoint,
        state:         &SessionState,
        elapsed_ms:    Millis,
        missed_urgent: bool,
    ) -> Option<SessionOutcome> {
        let timed = checkpoint != Checkpoint::Choice;
        let resources_checked = timed || self.immediate_resource_defeat;
        let r = &state.resources;

        let reason = if timed && state.inbox.is_full() {
            Some(DefeatReason::Burnout)
        } else if resources_checked && r.is_budget_depleted() {
            Some(DefeatReason::BudgetDepletion)
        } else if resources_checked && self.collapse_defeats && r.data_quality <= METRIC_MIN {
            Some(DefeatReason::DataQualityCollapse)
        } else if resources_checked && self.collapse_defeats && r.reputation <= METRIC_MIN {
            Some(DefeatReason::ReputationCollapse)
        } else if missed_urgent {
            Some(DefeatReason::MissedUrgentDeadline)
        } else {
            None
        };

        if let Some(reason) = reason {
            return Some(SessionOutcome::Defeat { reason });
        }
        if timed && elapsed_ms >= self.session_length_ms {
            return Some(SessionOutcome::Victory);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbox::DeliveredEmail;

    fn fill_inbox(state: &mut SessionState, n: usize) {
        for i in 0..n {
            state.inbox.push(DeliveredEmail {
                template_id:     format!("e{i}"),
                delivered_at_ms: 0,
                is_urgent:       false,
            });
        }
    }

    #[test]
    fn burnout_outranks_every_other_condition() {
        let config = SessionConfig { max_inbox_capacity: 2, ..SessionConfig::default_test() };
        let mut state = SessionState::new(&config);
        fill_inbox(&mut state, 2);
        state.resources.budget = -5;
        let mut eval = TerminationEvaluator::new(&config);
        let outcome = eval.evaluate(Checkpoint::DeadlineExpired, &state, config.session_length_ms, true);
        assert_eq!(outcome, Some(SessionOutcome::Defeat { reason: DefeatReason::Burnout }));
    }

    #[test]
    fn missed_urgent_beats_victory() {
        let config = SessionConfig::default_test();
        let state = SessionState::new(&config);
        let mut eval = TerminationEvaluator::new(&config);
        let outcome = eval.evaluate(Checkpoint::DeadlineExpired, &state, config.session_length_ms, true);
        assert_eq!(outcome.and_then(|o| o.defeat_reason()), Some(DefeatReason::MissedUrgentDeadline));
    }

    #[test]
    fn latches_after_first_outcome() {
        let config = SessionConfig::default_test();
        let state = SessionState::new(&config);
        let mut eval = TerminationEvaluator::new(&config);
        assert!(!eval.has_fired());
        assert_eq!(eval.evaluate(Checkpoint::Tick, &state, 180_000, false), Some(SessionOutcome::Victory));
        assert!(eval.has_fired());
        assert_eq!(eval.evaluate(Checkpoint::Tick, &state, 180_100, false), None);
        assert_eq!(eval.evaluate(Checkpoint::DeadlineExpired, &state, 180_200, true), None);
        assert_eq!(eval.outcome(), Some(SessionOutcome::Victory));
    }

    #[test]
    fn choice_checkpoint_defers_budget_unless_configured() {
        let config = SessionConfig::default_test();
        let mut state = SessionState::new(&config);
        state.resources.budget = 0;
        let mut deferred = TerminationEvaluator::new(&config);
        assert_eq!(deferred.evaluate(Checkpoint::Choice, &state, 1_000, false), None);

        let eager_config = SessionConfig { immediate_resource_defeat: true, ..config };
        let mut eager = TerminationEvaluator::new(&eager_config);
        assert_eq!(
            eager.evaluate(Checkpoint::Choice, &state, 1_000, false),
            Some(SessionOutcome::Defeat { reason: DefeatReason::BudgetDepletion })
        );
    }

    #[test]
    fn collapse_defeats_are_opt_in() {
        let config = SessionConfig::default_test();
        let mut state = SessionState::new(&config);
        state.resources.reputation = 0;
        assert_eq!(TerminationEvaluator::new(&config).evaluate(Checkpoint::Tick, &state, 10, false), None);

        let strict = SessionConfig { collapse_defeats: true, ..config };
        assert_eq!(
            TerminationEvaluator::new(&strict).evaluate(Checkpoint::Tick, &state, 10, false),
            Some(SessionOutcome::Defeat { reason: DefeatReason::ReputationCollapse })
        );
    }
}
