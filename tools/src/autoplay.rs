//! Autoplay policies for headless runs.
//!
//! The bot answers the running urgent email first, otherwise the most
//! recent one, but only once it has been in the inbox for the reaction
//! delay. Disabled choices are skipped unless nothing is enabled.

use governopoly_core::{
    command::PlayerCommand,
    engine::SessionEngine,
    error::GameResult,
    rng::SubsystemSlot,
    types::{ChoiceId, EmailId},
};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// First enabled choice.
    First,
    /// Spend the least budget.
    Frugal,
    /// Highest profit impact.
    Profit,
    /// Uniform among enabled choices, from the autoplay RNG stream.
    Random,
    /// Never answer. Useful for checking burnout and deadline defeats.
    Idle,
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Self::First),
            "frugal" => Ok(Self::Frugal),
            "profit" => Ok(Self::Profit),
            "random" => Ok(Self::Random),
            "idle" => Ok(Self::Idle),
            other => Err(format!("unknown policy '{other}'")),
        }
    }
}

pub struct Autoplayer {
    policy:      Policy,
    reaction_ms: u64,
    answered:    u64,
}

impl Autoplayer {
    pub fn new(policy: Policy, reaction_ms: u64) -> Self {
        Self { policy, reaction_ms, answered: 0 }
    }

    pub fn answered(&self) -> u64 {
        self.answered
    }

    /// Answer every email whose reaction delay has passed.
    pub fn act(&mut self, engine: &mut SessionEngine) -> GameResult<()> {
        let pending = engine.state().inbox.len();
        for _ in 0..pending {
            let Some(command) = self.decide(engine) else {
                break;
            };
            log::debug!("autoplay: {command:?}");
            engine.submit(command)?;
            self.answered += 1;
        }
        Ok(())
    }

    fn decide(&self, engine: &SessionEngine) -> Option<PlayerCommand> {
        if self.policy == Policy::Idle || !engine.clock.is_running() {
            return None;
        }
        let email_id = self.target(engine)?;
        let choice_id = self.pick_choice(engine, &email_id)?;
        Some(PlayerCommand::Choose { email_id, choice_id })
    }

    fn target(&self, engine: &SessionEngine) -> Option<EmailId> {
        let now = engine.elapsed_ms();
        let ready: Vec<_> = engine
            .state()
            .inbox
            .most_recent_first()
            .filter(|e| now.saturating_sub(e.delivered_at_ms) >= self.reaction_ms)
            .collect();
        ready
            .iter()
            .find(|e| engine.urgent_remaining_secs(&e.template_id).is_some())
            .or_else(|| ready.first())
            .map(|e| e.template_id.clone())
    }

    fn pick_choice(&self, engine: &SessionEngine, email_id: &str) -> Option<ChoiceId> {
        let availability = engine.choice_availability(email_id)?;
        let template = engine.catalog().get(email_id)?;
        let enabled: Vec<ChoiceId> = availability.iter().filter(|a| a.enabled).map(|a| a.choice_id).collect();
        let options = if enabled.is_empty() {
            availability.iter().map(|a| a.choice_id).collect()
        } else {
            enabled
        };
        let outcome = |id: ChoiceId| template.choice(id).map(|c| &c.outcome);

        match self.policy {
            Policy::Idle => None,
            Policy::First => options.first().copied(),
            Policy::Frugal => options
                .iter()
                .max_by_key(|id| outcome(**id).map(|o| o.budget_impact).unwrap_or(i64::MIN))
                .copied(),
            Policy::Profit => options
                .iter()
                .max_by_key(|id| outcome(**id).map(|o| o.profit_impact).unwrap_or(i64::MIN))
                .copied(),
            Policy::Random => {
                let mut rng = engine
                    .rng_bank
                    .for_subsystem_at_tick(SubsystemSlot::Autoplay, engine.clock.current_tick);
                rng.pick_index(options.len()).map(|i| options[i])
            }
        }
    }
}
