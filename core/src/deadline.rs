//! Urgent deadline tracker.
//!
//! One countdown per urgent email in the inbox:
//!   Running -> Answered   (player chose before the deadline)
//!   Running -> Expired    (session clock reached the deadline)
//!   Running -> Cancelled  (session ended for any other reason)
//!
//! Remaining time is always recomputed from the session clock, never
//! decremented per tick, so it is exact however the ticks are spaced.

use crate::types::{EmailId, Millis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CountdownState {
    Running,
    Answered { at_ms: Millis },
    Expired { at_ms: Millis },
    Cancelled { at_ms: Millis },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrgentCountdown {
    pub email_id:      EmailId,
    pub started_at_ms: Millis,
    pub countdown_ms:  Millis,
    pub state:         CountdownState,
}

impl UrgentCountdown {
    pub fn deadline_ms(&self) -> Millis {
        self.started_at_ms.saturating_add(self.countdown_ms)
    }

    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    pub fn remaining_ms(&self, now_ms: Millis) -> Millis {
        if !self.is_running() {
            return 0;
        }
        self.deadline_ms().saturating_sub(now_ms)
    }

    /// Whole seconds left, rounded down.
    pub fn remaining_secs(&self, now_ms: Millis) -> u64 {
        self.remaining_ms(now_ms) / 1000
    }
}

#[derive(Debug, Clone, Default)]
pub struct UrgentDeadlineTracker {
    running:  BTreeMap<EmailId, UrgentCountdown>,
    finished: Vec<UrgentCountdown>,
}

impl UrgentDeadlineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown. A running countdown for the same id is replaced.
    pub fn start(&mut self, email_id: &str, now_ms: Millis, countdown_ms: Millis) -> &UrgentCountdown {
        let countdown = UrgentCountdown {
            email_id:      email_id.to_string(),
            started_at_ms: now_ms,
            countdown_ms,
            state:         CountdownState::Running,
        };
        self.running.insert(email_id.to_string(), countdown);
        &self.running[email_id]
    }

    /// Player answered in time. Returns false if no countdown was running.
    pub fn answer(&mut self, email_id: &str, now_ms: Millis) -> bool {
        self.finish(email_id, CountdownState::Answered { at_ms: now_ms })
    }

    /// Expire every countdown whose deadline is at or before `now_ms`,
    /// earliest deadline first.
    pub fn expire_due(&mut self, now_ms: Millis) -> Vec<UrgentCountdown> {
        let mut due: Vec<(Millis, EmailId)> = self
            .running
            .values()
            .filter(|c| c.deadline_ms() <= now_ms)
            .map(|c| (c.deadline_ms(), c.email_id.clone()))
            .collect();
        due.sort();

        let mut expired = Vec::with_capacity(due.len());
        for (deadline_ms, email_id) in due {
            if let Some(mut countdown) = self.running.remove(&email_id) {
                countdown.state = CountdownState::Expired { at_ms: deadline_ms };
                expired.push(countdown.clone());
                self.finished.push(countdown);
            }
        }
        expired
    }

    /// Cancel everything still running. Returns how many were cancelled.
    pub fn cancel_all(&mut self, now_ms: Millis) -> usize {
        let cancelled = self.running.len();
        for (_, mut countdown) in std::mem::take(&mut self.running) {
            countdown.state = CountdownState::Cancelled { at_ms: now_ms };
            self.finished.push(countdown);
        }
        cancelled
    }

    pub fn get(&self, email_id: &str) -> Option<&UrgentCountdown> {
        self.running
            .get(email_id)
            .or_else(|| self.finished.iter().rev().find(|c| c.email_id == email_id))
    }

    pub fn remaining_secs(&self, email_id: &str, now_ms: Millis) -> Option<u64> {
        self.running.get(email_id).map(|c| c.remaining_secs(now_ms))
    }

    pub fn has_outstanding(&self) -> bool {
        !self.running.is_empty()
    }

    pub fn outstanding(&self) -> usize {
        self.running.len()
    }

    /// Countdowns that are no longer running, in completion order.
    pub fn history(&self) -> &[UrgentCountdown] {
        &self.finished
    }

    fn finish(&mut self, email_id: &str, state: CountdownState) -> bool {
        match self.running.remove(email_id) {
            Some(mut countdown) => {
                countdown.state = state;
                self.finished.push(countdown);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_is_derived_from_clock_not_ticks() {
        let mut tracker = UrgentDeadlineTracker::new();
        tracker.start("u", 5_000, 10_000);
        assert_eq!(tracker.remaining_secs("u", 5_000), Some(10));
        assert_eq!(tracker.remaining_secs("u", 5_999), Some(9));
        assert_eq!(tracker.remaining_secs("u", 14_999), Some(0));
        assert!(tracker.expire_due(14_999).is_empty());
    }

    #[test]
    fn expires_exactly_at_deadline() {
        let mut tracker = UrgentDeadlineTracker::new();
        tracker.start("u", 1_000, 10_000);
        let expired = tracker.expire_due(11_000);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].state, CountdownState::Expired { at_ms: 11_000 });
        assert!(!tracker.has_outstanding());
        assert!(tracker.expire_due(50_000).is_empty(), "expiry fires once");
    }

    #[test]
    fn answered_countdown_never_expires() {
        let mut tracker = UrgentDeadlineTracker::new();
        tracker.start("u", 0, 10_000);
        assert!(tracker.answer("u", 9_999));
        assert!(tracker.expire_due(1_000_000).is_empty());
        assert_eq!(tracker.get("u").map(|c| c.state), Some(CountdownState::Answered { at_ms: 9_999 }));
        assert!(!tracker.answer("u", 10_000), "already answered");
    }

    #[test]
    fn expiry_is_ordered_by_deadline() {
        let mut tracker = UrgentDeadlineTracker::new();
        tracker.start("late", 2_000, 10_000);
        tracker.start("early", 3_000, 5_000);
        let ids: Vec<String> = tracker.expire_due(20_000).into_iter().map(|c| c.email_id).collect();
        assert_eq!(ids, vec!["early".to_string(), "late".to_string()]);
    }

    #[test]
    fn cancel_all_leaves_nothing_running() {
        let mut tracker = UrgentDeadlineTracker::new();
        tracker.start("a", 0, 10_000);
        tracker.start("b", 0, 10_000);
        assert_eq!(tracker.cancel_all(4_000), 2);
        assert!(!tracker.has_outstanding());
        assert!(tracker.expire_due(100_000).is_empty());
        assert!(tracker
            .history()
            .iter()
            .all(|c| c.state == CountdownState::Cancelled { at_ms: 4_000 }));
    }
}
