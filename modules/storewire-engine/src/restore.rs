//! One-shot restore notification gate.

use std::mem;

/// Tracks whether a restore round trip still owes the consumer its terminal
/// notification. Armed by `restore()`, consumed by the first
/// completed/failed event; anything after that is a silent no-op, so the
/// consumer sees at most one terminal notification per restore call.
#[derive(Debug, Default)]
pub struct RestoreSession {
    needs_notification: bool,
}

impl RestoreSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) {
        self.needs_notification = true;
    }

    /// Consume the pending notification. Returns whether one was owed.
    pub fn take_pending(&mut self) -> bool {
        mem::replace(&mut self.needs_notification, false)
    }

    pub fn is_pending(&self) -> bool {
        self.needs_notification
    }
}
