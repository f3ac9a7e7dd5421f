//! Best-effort listener notification.
//!
//! Every consumer-visible callback goes through `notify`: a hook that fails
//! or panics is logged with its context label and swallowed, so dispatch
//! order can never be broken by a consumer bug.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

/// What happened when a hook was invoked. Dispatch discards this; tests
/// observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    Failed,
}

/// Invoke one listener hook, containing both `Err` returns and panics.
pub fn notify(label: &str, hook: impl FnOnce() -> anyhow::Result<()>) -> NotifyOutcome {
    match catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(())) => NotifyOutcome::Delivered,
        Ok(Err(err)) => {
            warn!(hook = label, error = %err, "listener hook failed");
            NotifyOutcome::Failed
        }
        Err(payload) => {
            warn!(hook = label, panic = panic_message(&payload), "listener hook panicked");
            NotifyOutcome::Failed
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
