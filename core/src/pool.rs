//! Available pool: which catalog templates may still be delivered.
//!
//! Stored as an exclusion set over the catalog: a template is available
//! unless it was withdrawn since the last replenish or is a consumed
//! one-shot. Replenishing never re-admits a template still in the inbox.

use crate::types::EmailId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailablePool {
    excluded:     BTreeSet<EmailId>,
    consumed:     BTreeSet<EmailId>,
    replenished:  u32,
}

impl AvailablePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_available(&self, id: &str) -> bool {
        !self.excluded.contains(id)
    }

    /// Take a template out of the pool. One-shot templates never come back.
    pub fn withdraw(&mut self, id: &str, one_shot: bool) {
        self.excluded.insert(id.to_string());
        if one_shot {
            self.consumed.insert(id.to_string());
        }
    }

    /// Everything the eligibility query must skip.
    pub fn excluded(&self) -> &BTreeSet<EmailId> {
        &self.excluded
    }

    /// Reset to the full catalog minus consumed one-shots and the given
    /// in-flight ids. Returns false when nothing would change.
    pub fn replenish<'a>(&mut self, in_inbox: impl IntoIterator<Item = &'a EmailId>) -> bool {
        let mut next = self.consumed.clone();
        next.extend(in_inbox.into_iter().cloned());
        if next == self.excluded {
            return false;
        }
        self.excluded = next;
        self.replenished += 1;
        true
    }

    pub fn replenish_count(&self) -> u32 {
        self.replenished
    }
}
