//! Session state: everything a tick or a choice may mutate.
//!
//! Owned exclusively by `SessionEngine`. Readers get snapshots.

use crate::{
    config::SessionConfig,
    inbox::Inbox,
    pool::AvailablePool,
    resources::ResourceState,
    types::EmailId,
};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct SessionState {
    pub resources:        ResourceState,
    pub inbox:            Inbox,
    pub answered:         BTreeSet<EmailId>,
    pub pool:             AvailablePool,
    pub emails_delivered: u64,
    pub emails_answered:  u64,
}

impl SessionState {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            resources: ResourceState::new(
                config.starting_budget,
                config.starting_profit,
                config.starting_data_quality,
                config.starting_reputation,
            ),
            inbox:            Inbox::new(config.max_inbox_capacity),
            answered:         BTreeSet::new(),
            pool:             AvailablePool::new(),
            emails_delivered: 0,
            emails_answered:  0,
        }
    }
}
