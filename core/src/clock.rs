//! Session clock: owns tick count, elapsed time, and lifecycle phase.
//!
//! Elapsed time is the sum of the wall-clock deltas handed to `advance()`,
//! so every deadline measured against it stays exact regardless of how
//! irregularly the host loop calls in.

use crate::types::{Millis, SessionId, Tick};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Ready,
    Running,
    Paused,
    Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClock {
    pub session_id:   SessionId,
    pub current_tick: Tick,
    pub elapsed_ms:   Millis,
    pub phase:        SessionPhase,
}

impl SessionClock {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            current_tick: 0,
            elapsed_ms: 0,
            phase: SessionPhase::Ready,
        }
    }

    /// Advance by `delta_ms` of wall-clock time. Returns the new tick number.
    /// Panics if called while not running; callers must check.
    pub fn advance(&mut self, delta_ms: Millis) -> Tick {
        assert!(self.is_running(), "advance() called on a {:?} clock", self.phase);
        self.current_tick += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
        self.current_tick
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn is_ended(&self) -> bool {
        self.phase == SessionPhase::Ended
    }

    pub fn start(&mut self)  { self.phase = SessionPhase::Running; }
    pub fn pause(&mut self)  { self.phase = SessionPhase::Paused;  }
    pub fn resume(&mut self) { self.phase = SessionPhase::Running; }
    pub fn end(&mut self)    { self.phase = SessionPhase::Ended;   }

    /// Milliseconds left before `session_length_ms` is reached.
    pub fn remaining_ms(&self, session_length_ms: Millis) -> Millis {
        session_length_ms.saturating_sub(self.elapsed_ms)
    }

    /// Whole seconds left, rounded down.
    pub fn remaining_secs(&self, session_length_ms: Millis) -> u64 {
        self.remaining_ms(session_length_ms) / 1000
    }
}
