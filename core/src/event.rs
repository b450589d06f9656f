//! Session events: the record of everything the engine did.
//!
//! RULE: Every state change the engine makes is reported as an event.
//! Events are returned to the caller, fanned out to observers, and
//! appended to the journal in emission order.

use crate::{
    inbox::DeliveredEmail,
    report::SessionReport,
    resources::{OutcomeImpact, ResourceState},
    types::{ChoiceId, EmailId, Millis, SessionId, Tick},
};
use serde::{Deserialize, Serialize};

/// Which notification sound/vibration the front end should play.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCue {
    Regular,
    Urgent,
}

impl NotificationCue {
    pub fn for_email(email: &DeliveredEmail) -> Self {
        if email.is_urgent { Self::Urgent } else { Self::Regular }
    }
}

/// Every event emitted during a session.
/// Variants may be appended; never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    // ── Lifecycle ──────────────────────────────────
    SessionStarted {
        session_id: SessionId,
        seed: u64,
    },
    SessionPaused {
        elapsed_ms: Millis,
    },
    SessionResumed {
        elapsed_ms: Millis,
    },
    SessionEnded {
        report: SessionReport,
    },

    // ── Arrivals ───────────────────────────────────
    EmailDelivered {
        email: DeliveredEmail,
        cue: NotificationCue,
    },
    PoolReplenished {
        elapsed_ms: Millis,
        replenish_count: u32,
    },

    // ── Urgent deadlines ───────────────────────────
    UrgentCountdownStarted {
        email_id: EmailId,
        deadline_ms: Millis,
    },
    UrgentCountdownAnswered {
        email_id: EmailId,
        elapsed_ms: Millis,
        remaining_ms: Millis,
    },
    UrgentDeadlineMissed {
        email_id: EmailId,
        deadline_ms: Millis,
    },

    // ── Player decisions ───────────────────────────
    ChoiceApplied {
        elapsed_ms: Millis,
        email_id: EmailId,
        choice_id: ChoiceId,
        description: String,
        impact: OutcomeImpact,
        resources_after: ResourceState,
    },
}

impl SessionEvent {
    /// Stable string name, stored in the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. }          => "session_started",
            Self::SessionPaused { .. }           => "session_paused",
            Self::SessionResumed { .. }          => "session_resumed",
            Self::SessionEnded { .. }            => "session_ended",
            Self::EmailDelivered { .. }          => "email_delivered",
            Self::PoolReplenished { .. }         => "pool_replenished",
            Self::UrgentCountdownStarted { .. }  => "urgent_countdown_started",
            Self::UrgentCountdownAnswered { .. } => "urgent_countdown_answered",
            Self::UrgentDeadlineMissed { .. }    => "urgent_deadline_missed",
            Self::ChoiceApplied { .. }           => "choice_applied",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub session_id: SessionId,
    pub tick:       Tick,
    pub elapsed_ms: Millis,
    pub event_type: String,
    pub payload:    String, // JSON-serialized SessionEvent
}
