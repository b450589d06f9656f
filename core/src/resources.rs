//! Resource state: the four counters every choice moves.
//!
//! Budget and profit are unclamped. Data quality and reputation are
//! clamped to [METRIC_MIN, METRIC_MAX] after every mutation.

use crate::catalog::{Choice, Outcome};
use crate::types::ChoiceId;
use serde::{Deserialize, Serialize};

pub const METRIC_MIN: i32 = 0;
pub const METRIC_MAX: i32 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Budget,
    DataQuality,
    Reputation,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceState {
    pub budget:       i64,
    pub profit:       i64,
    pub data_quality: i32,
    pub reputation:   i32,
}

/// Final or intermediate numbers handed to score screens and the leaderboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub cdo_budget:     i64,
    pub company_profit: i64,
    pub data_quality:   i32,
    pub reputation:     i32,
}

/// Raw impacts of an applied outcome, as authored (pre-clamp).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeImpact {
    pub budget_impact:       i64,
    pub profit_impact:       i64,
    pub data_quality_impact: i32,
    pub reputation_impact:   i32,
}

impl From<&Outcome> for OutcomeImpact {
    fn from(o: &Outcome) -> Self {
        Self {
            budget_impact:       o.budget_impact,
            profit_impact:       o.profit_impact,
            data_quality_impact: o.data_quality_impact,
            reputation_impact:   o.reputation_impact,
        }
    }
}

/// Whether a choice should be offered, and which resources it would overdraw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceAvailability {
    pub choice_id:  ChoiceId,
    pub text:       String,
    pub enabled:    bool,
    pub blocked_by: Vec<ResourceKind>,
}

impl ResourceState {
    pub fn new(budget: i64, profit: i64, data_quality: i32, reputation: i32) -> Self {
        Self {
            budget,
            profit,
            data_quality: clamp_metric(data_quality),
            reputation:   clamp_metric(reputation),
        }
    }

    /// Apply an outcome. Returns the raw impacts for display.
    pub fn apply(&mut self, outcome: &Outcome) -> OutcomeImpact {
        self.budget = self.budget.saturating_add(outcome.budget_impact);
        self.profit = self.profit.saturating_add(outcome.profit_impact);
        self.data_quality = clamp_metric(self.data_quality.saturating_add(outcome.data_quality_impact));
        self.reputation = clamp_metric(self.reputation.saturating_add(outcome.reputation_impact));
        OutcomeImpact::from(outcome)
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            cdo_budget:     self.budget,
            company_profit: self.profit,
            data_quality:   self.data_quality,
            reputation:     self.reputation,
        }
    }

    pub fn is_budget_depleted(&self) -> bool {
        self.budget <= 0
    }

    /// A choice is disabled when a negative impact exceeds what is left.
    /// Advisory only: `apply` never rejects an outcome.
    pub fn availability(&self, choice: &Choice) -> ChoiceAvailability {
        let o = &choice.outcome;
        let mut blocked_by = Vec::new();
        if o.budget_impact < 0 && o.budget_impact.unsigned_abs() > self.budget.max(0) as u64 {
            blocked_by.push(ResourceKind::Budget);
        }
        if o.data_quality_impact < 0 && o.data_quality_impact.unsigned_abs() > self.data_quality as u32 {
            blocked_by.push(ResourceKind::DataQuality);
        }
        if o.reputation_impact < 0 && o.reputation_impact.unsigned_abs() > self.reputation as u32 {
            blocked_by.push(ResourceKind::Reputation);
        }
        ChoiceAvailability {
            choice_id: choice.id,
            text:      choice.text.clone(),
            enabled:   blocked_by.is_empty(),
            blocked_by,
        }
    }
}

fn clamp_metric(value: i32) -> i32 {
    value.clamp(METRIC_MIN, METRIC_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(budget: i64, profit: i64, dq: i32, rep: i32) -> Outcome {
        Outcome {
            description:         "test".into(),
            budget_impact:       budget,
            profit_impact:       profit,
            data_quality_impact: dq,
            reputation_impact:   rep,
        }
    }

    #[test]
    fn metrics_clamp_but_money_does_not() {
        let mut r = ResourceState::new(1_000_000, 0, 95, 3);
        let impact = r.apply(&outcome(-1_200_000, -50, 20, -40));
        assert_eq!(r.budget, -200_000);
        assert_eq!(r.profit, -50);
        assert_eq!(r.data_quality, 100);
        assert_eq!(r.reputation, 0);
        assert_eq!(impact.data_quality_impact, 20, "impact is reported pre-clamp");
        assert_eq!(impact.reputation_impact, -40);
        assert!(r.is_budget_depleted());
    }

    #[test]
    fn availability_flags_overdrawn_resources() {
        let r = ResourceState::new(100_000, 0, 10, 50);
        let choice = Choice {
            id: 2,
            text: "Expensive".into(),
            outcome: outcome(-150_000, 0, -20, -50),
        };
        let availability = r.availability(&choice);
        assert!(!availability.enabled);
        assert_eq!(availability.blocked_by, vec![ResourceKind::Budget, ResourceKind::DataQuality]);

        let affordable = Choice { id: 3, text: "Cheap".into(), outcome: outcome(-100_000, -1, -10, 0) };
        assert!(r.availability(&affordable).enabled, "spending exactly what is left is allowed");
    }

    #[test]
    fn stats_use_leaderboard_field_names() {
        let json = serde_json::to_value(ResourceState::new(5, 6, 7, 8).stats()).unwrap();
        assert_eq!(json["cdoBudget"], 5);
        assert_eq!(json["companyProfit"], 6);
        assert_eq!(json["dataQuality"], 7);
        assert_eq!(json["reputation"], 8);
    }
}
