//! Session balance configuration.
//!
//! One structured settings object, loaded from `{data_dir}/session.json`.
//! Every field is required in the file: a missing value fails the load,
//! and `validate()` runs again when an engine is built, so a bad config
//! never reaches the `Running` phase.

use crate::{
    error::{GameError, GameResult},
    types::{EmailId, Millis},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Substituted into template bodies and reported on the leaderboard.
    pub company_name: String,

    /// CDO budget at session start. May go negative during play.
    pub starting_budget: i64,
    /// Company profit at session start.
    pub starting_profit: i64,
    /// Data quality at session start [0, 100].
    pub starting_data_quality: i32,
    /// Reputation at session start [0, 100].
    pub starting_reputation: i32,

    /// Surviving this long is a victory.
    pub session_length_ms: Millis,
    /// Nominal host loop interval. Arrival probabilities are quoted per interval.
    pub tick_interval_ms: Millis,

    /// Regular emails arrive once the gap since the last one exceeds a
    /// threshold rolled uniformly from this range.
    pub regular_interval_min_ms: Millis,
    pub regular_interval_max_ms: Millis,

    /// Chance of an urgent email per `tick_interval_ms` of play.
    pub urgent_probability_per_tick: f64,
    /// No urgent email before this much elapsed time.
    pub urgent_min_elapsed_ms: Millis,
    /// Time the player has to answer an urgent email.
    pub urgent_countdown_ms: Millis,

    /// Reaching this many unanswered emails is a burnout defeat.
    pub max_inbox_capacity: usize,

    /// One-shot intro template force-delivered after `welcome_delay_ms`.
    pub welcome_email_id: Option<EmailId>,
    pub welcome_delay_ms: Millis,

    /// Also check resource defeats right after a choice, not only at the next tick.
    pub immediate_resource_defeat: bool,
    /// Data quality or reputation hitting 0 ends the session.
    pub collapse_defeats: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            company_name:                "Nine Lives Insurance".into(),
            starting_budget:             1_000_000,
            starting_profit:             0,
            starting_data_quality:       50,
            starting_reputation:         50,
            session_length_ms:           180_000,
            tick_interval_ms:            100,
            regular_interval_min_ms:     7_000,
            regular_interval_max_ms:     10_000,
            urgent_probability_per_tick: 0.01,
            urgent_min_elapsed_ms:       15_000,
            urgent_countdown_ms:         10_000,
            max_inbox_capacity:          5,
            welcome_email_id:            Some("new_1".into()),
            welcome_delay_ms:            500,
            immediate_resource_defeat:   false,
            collapse_defeats:            false,
        }
    }
}

impl SessionConfig {
    /// Load from the data/ directory.
    /// In tests, use SessionConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/session.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SessionConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Canonical balance without the welcome email, so tests control deliveries.
    pub fn default_test() -> Self {
        Self {
            company_name: "Test Co".into(),
            welcome_email_id: None,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> GameResult<()> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> GameResult<()> {
            Err(GameError::InvalidConfig { field, reason: reason.into() })
        }

        if self.company_name.trim().is_empty() {
            return invalid("company_name", "must not be empty");
        }
        for (field, value) in [
            ("starting_data_quality", self.starting_data_quality),
            ("starting_reputation", self.starting_reputation),
        ] {
            if !(0..=100).contains(&value) {
                return invalid(field, format!("{value} is outside 0..=100"));
            }
        }
        for (field, value) in [
            ("session_length_ms", self.session_length_ms),
            ("tick_interval_ms", self.tick_interval_ms),
            ("urgent_countdown_ms", self.urgent_countdown_ms),
        ] {
            if value == 0 {
                return invalid(field, "must be greater than zero");
            }
        }
        if self.regular_interval_min_ms > self.regular_interval_max_ms {
            return invalid(
                "regular_interval_min_ms",
                format!(
                    "{} exceeds regular_interval_max_ms {}",
                    self.regular_interval_min_ms, self.regular_interval_max_ms
                ),
            );
        }
        if !(0.0..=1.0).contains(&self.urgent_probability_per_tick) {
            return invalid(
                "urgent_probability_per_tick",
                format!("{} is not a probability", self.urgent_probability_per_tick),
            );
        }
        if self.max_inbox_capacity == 0 {
            return invalid("max_inbox_capacity", "must be at least 1");
        }
        if matches!(&self.welcome_email_id, Some(id) if id.trim().is_empty()) {
            return invalid("welcome_email_id", "must not be blank when set");
        }
        Ok(())
    }
}
