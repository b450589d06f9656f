//! Inbox: delivered but unanswered emails, in arrival order.
//!
//! The capacity is a burnout trigger, not an insertion cap: `push` never
//! refuses because the inbox is full. It only refuses duplicates.

use crate::types::{EmailId, Millis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveredEmail {
    pub template_id:     EmailId,
    pub delivered_at_ms: Millis,
    pub is_urgent:       bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inbox {
    emails:   Vec<DeliveredEmail>,
    capacity: usize,
}

impl Inbox {
    pub fn new(capacity: usize) -> Self {
        Self { emails: Vec::with_capacity(capacity), capacity }
    }

    /// Append in arrival order. Returns false if the id is already present.
    pub fn push(&mut self, email: DeliveredEmail) -> bool {
        if self.contains(&email.template_id) {
            return false;
        }
        self.emails.push(email);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<DeliveredEmail> {
        let pos = self.emails.iter().position(|e| e.template_id == id)?;
        Some(self.emails.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&DeliveredEmail> {
        self.emails.iter().find(|e| e.template_id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Burnout threshold reached.
    pub fn is_full(&self) -> bool {
        self.emails.len() >= self.capacity
    }

    /// Arrival order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &DeliveredEmail> {
        self.emails.iter()
    }

    /// Display order: newest first.
    pub fn most_recent_first(&self) -> impl Iterator<Item = &DeliveredEmail> {
        self.emails.iter().rev()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EmailId> {
        self.emails.iter().map(|e| &e.template_id)
    }

    pub fn clear(&mut self) {
        self.emails.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(id: &str, at: Millis) -> DeliveredEmail {
        DeliveredEmail { template_id: id.into(), delivered_at_ms: at, is_urgent: false }
    }

    #[test]
    fn push_rejects_duplicates_but_not_overflow() {
        let mut inbox = Inbox::new(2);
        assert!(inbox.push(email("a", 0)));
        assert!(inbox.push(email("b", 10)));
        assert!(inbox.is_full());
        assert!(inbox.push(email("c", 20)), "overflow is a defeat signal, not a cap");
        assert!(!inbox.push(email("a", 30)));
        assert_eq!(inbox.len(), 3);
    }

    #[test]
    fn display_order_is_newest_first() {
        let mut inbox = Inbox::new(5);
        inbox.push(email("first", 0));
        inbox.push(email("second", 100));
        inbox.push(email("third", 200));
        let shown: Vec<&str> = inbox.most_recent_first().map(|e| e.template_id.as_str()).collect();
        assert_eq!(shown, vec!["third", "second", "first"]);

        assert_eq!(inbox.remove("second").map(|e| e.delivered_at_ms), Some(100));
        assert!(inbox.remove("second").is_none());
        assert_eq!(inbox.len(), 2);
    }
}
