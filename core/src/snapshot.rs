//! Read model handed to the presentation layer.
//!
//! A snapshot is the only view of a session the UI gets: it never holds a
//! reference into engine state. One is also journaled every
//! SNAPSHOT_INTERVAL ticks so a session can be inspected after the fact.

use crate::{
    catalog::Category,
    clock::SessionPhase,
    resources::StatsSnapshot,
    termination::SessionOutcome,
    types::{EmailId, Millis, SessionId, Tick},
};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_INTERVAL: Tick = 50; // every 5s at the nominal tick

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub session_id:     SessionId,
    pub phase:          SessionPhase,
    pub tick:           Tick,
    pub elapsed_ms:     Millis,
    pub remaining_secs: u64,
    pub stats:          StatsSnapshot,
    pub inbox_capacity: usize,
    /// Newest first.
    pub inbox:          Vec<InboxEntry>,
    pub outcome:        Option<SessionOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboxEntry {
    pub email_id:              EmailId,
    pub sender:                String,
    pub title:                 String,
    pub category:              Category,
    pub preview:               String,
    pub delivered_at_ms:       Millis,
    pub is_urgent:             bool,
    pub urgent_remaining_secs: Option<u64>,
}
