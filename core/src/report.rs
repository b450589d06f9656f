//! End-of-session reporting: the terminal record, score tiers, and the
//! leaderboard submission payload. Submitting it is somebody else's job.

use crate::{
    resources::StatsSnapshot,
    termination::SessionOutcome,
    types::{Millis, SessionId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionReport {
    pub session_id:       SessionId,
    pub outcome:          SessionOutcome,
    pub stats:            StatsSnapshot,
    pub elapsed_ms:       Millis,
    pub emails_delivered: u64,
    pub emails_answered:  u64,
}

impl SessionReport {
    pub fn tier(&self) -> PerformanceTier {
        PerformanceTier::from_profit(self.stats.company_profit)
    }

    /// Headline for the end screen.
    pub fn headline(&self) -> &'static str {
        match self.outcome {
            SessionOutcome::Victory => self.tier().headline(),
            SessionOutcome::Defeat { reason } => reason.headline(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Difficult,
    Challenging,
    Average,
    Solid,
    Excellent,
    Outstanding,
}

impl PerformanceTier {
    pub fn from_profit(company_profit: i64) -> Self {
        match company_profit {
            p if p >= 15_000_000 => Self::Outstanding,
            p if p >= 10_000_000 => Self::Excellent,
            p if p >= 6_000_000 => Self::Solid,
            p if p >= 3_000_000 => Self::Average,
            p if p >= 1_000_000 => Self::Challenging,
            _ => Self::Difficult,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Self::Outstanding => "Outstanding CDO Performance!",
            Self::Excellent => "Excellent Job!",
            Self::Solid => "Solid Performance",
            Self::Average => "Average Results",
            Self::Challenging => "Challenging Year",
            Self::Difficult => "Difficult Times",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub player_name:    String,
    pub company:        String,
    pub company_profit: i64,
    pub cdo_budget:     i64,
    pub data_quality:   i32,
    pub reputation:     i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defeat:         Option<String>,
    pub timestamp:      DateTime<Utc>,
}

impl LeaderboardEntry {
    pub fn from_report(
        report:      &SessionReport,
        player_name: &str,
        company:     &str,
        timestamp:   DateTime<Utc>,
    ) -> Self {
        Self {
            player_name:    player_name.trim().to_string(),
            company:        company.to_string(),
            company_profit: report.stats.company_profit,
            cdo_budget:     report.stats.cdo_budget,
            data_quality:   report.stats.data_quality,
            reputation:     report.stats.reputation,
            defeat:         report.outcome.defeat_reason().map(|r| r.legacy_code().to_string()),
            timestamp,
        }
    }
}
