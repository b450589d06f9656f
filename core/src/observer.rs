//! Observer hooks for the collaborators outside the core: the inbox UI,
//! the sound cue player, and the screen that takes over at game over.

use crate::{
    engine::ChoiceReceipt,
    event::NotificationCue,
    inbox::DeliveredEmail,
    report::SessionReport,
};

pub trait SessionObserver: Send {
    /// A new email landed in the inbox.
    fn on_email_delivered(&mut self, _email: &DeliveredEmail, _cue: NotificationCue) {}

    /// A choice was applied; the receipt carries the outcome text and raw impacts.
    fn on_choice_applied(&mut self, _receipt: &ChoiceReceipt) {}

    /// Called exactly once per session.
    fn on_session_ended(&mut self, _report: &SessionReport) {}
}
