use serde::{Deserialize, Serialize};
use crate::types::{ChoiceId, EmailId};

/// All player-issued commands.
/// Variants may be appended; never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Clock control ─────────────────────────────
    Start,
    Pause,
    Resume,

    // ── Decisions ─────────────────────────────────
    Choose {
        email_id:  EmailId,
        choice_id: ChoiceId,
    },
}
