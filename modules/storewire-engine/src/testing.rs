// Test doubles for the engine's two trait boundaries.
//
// ScriptedTransport (NativeTransport): method to response map with an
//   invocation log for assertions. Builder pattern: `.on()`, `.fail()`.
// RecordingListener (StoreListener): ordered capture of every hook,
//   armable to fail or panic on a named hook.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use storewire_common::{ReceiptSnapshot, StoreError};

use crate::listener::StoreListener;
use crate::transport::{NativeTransport, TransportError};

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

/// One recorded native invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub args: Vec<Value>,
}

/// Method to response transport double. Unregistered methods succeed with
/// `null`, matching the many native calls that return nothing.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: HashMap<String, Result<Value, String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a success response for a method.
    pub fn on(mut self, method: &str, response: Value) -> Self {
        self.responses.insert(method.to_string(), Ok(response));
        self
    }

    /// Script a rejection for a method.
    pub fn fail(mut self, method: &str, message: &str) -> Self {
        self.responses
            .insert(method.to_string(), Err(message.to_string()));
        self
    }

    /// Every invocation so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The invoked method names, in order.
    pub fn methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.method.clone())
            .collect()
    }
}

#[async_trait]
impl NativeTransport for ScriptedTransport {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            args,
        });
        match self.responses.get(method) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(TransportError::new(message.clone())),
            None => Ok(Value::Null),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingListener
// ---------------------------------------------------------------------------

/// One recorded hook invocation, with the fields dispatch handed over.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerCall {
    Ready,
    Purchasing {
        product_id: String,
    },
    Purchase {
        transaction_id: String,
        product_id: String,
        original_transaction_id: Option<String>,
    },
    PurchaseEnqueued {
        product_id: String,
        quantity: u32,
    },
    Deferred {
        product_id: String,
    },
    Finish {
        transaction_id: String,
        product_id: String,
    },
    Restore {
        transaction_id: String,
        product_id: String,
    },
    RestoreCompleted,
    RestoreFailed {
        code: i64,
    },
    ReceiptsRefreshed {
        bundle_identifier: String,
    },
    Error {
        message: String,
    },
    DownloadActive {
        transaction_id: String,
        product_id: String,
        progress: u8,
        time_remaining: f64,
    },
    DownloadCancelled {
        transaction_id: String,
        product_id: String,
    },
    DownloadFailed {
        transaction_id: String,
        product_id: String,
        code: Option<i64>,
        message: Option<String>,
    },
    DownloadFinished {
        transaction_id: String,
        product_id: String,
    },
    DownloadPaused {
        transaction_id: String,
        product_id: String,
    },
    DownloadWaiting {
        transaction_id: String,
        product_id: String,
    },
}

/// Records every hook invocation in order. `fail_on`/`panic_on` arm a named
/// hook to misbehave, for exercising the notification harness. The call is
/// recorded before the armed misbehavior fires, so order assertions still
/// see it.
#[derive(Debug, Default)]
pub struct RecordingListener {
    calls: Mutex<Vec<ListenerCall>>,
    fail_on: Option<&'static str>,
    panic_on: Option<&'static str>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named hook return an error.
    pub fn fail_on(mut self, hook: &'static str) -> Self {
        self.fail_on = Some(hook);
        self
    }

    /// Make the named hook panic.
    pub fn panic_on(mut self, hook: &'static str) -> Self {
        self.panic_on = Some(hook);
        self
    }

    /// Every hook invocation so far, in order.
    pub fn calls(&self) -> Vec<ListenerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, hook: &str, call: ListenerCall) -> Result<()> {
        // The lock guard is dropped before any armed panic, so the mutex is
        // never poisoned for later assertions.
        self.calls.lock().unwrap().push(call);
        if self.panic_on == Some(hook) {
            panic!("RecordingListener: forced panic in {hook}");
        }
        if self.fail_on == Some(hook) {
            bail!("RecordingListener: forced failure in {hook}");
        }
        Ok(())
    }
}

impl StoreListener for RecordingListener {
    fn ready(&self) -> Result<()> {
        self.record("ready", ListenerCall::Ready)
    }

    fn purchasing(&self, product_id: &str) -> Result<()> {
        self.record(
            "purchasing",
            ListenerCall::Purchasing {
                product_id: product_id.to_string(),
            },
        )
    }

    fn purchase(
        &self,
        transaction_id: &str,
        product_id: &str,
        original_transaction_id: Option<&str>,
    ) -> Result<()> {
        self.record(
            "purchase",
            ListenerCall::Purchase {
                transaction_id: transaction_id.to_string(),
                product_id: product_id.to_string(),
                original_transaction_id: original_transaction_id.map(str::to_string),
            },
        )
    }

    fn purchase_enqueued(&self, product_id: &str, quantity: u32) -> Result<()> {
        self.record(
            "purchase_enqueued",
            ListenerCall::PurchaseEnqueued {
                product_id: product_id.to_string(),
                quantity,
            },
        )
    }

    fn deferred(&self, product_id: &str) -> Result<()> {
        self.record(
            "deferred",
            ListenerCall::Deferred {
                product_id: product_id.to_string(),
            },
        )
    }

    fn finish(&self, transaction_id: &str, product_id: &str) -> Result<()> {
        self.record(
            "finish",
            ListenerCall::Finish {
                transaction_id: transaction_id.to_string(),
                product_id: product_id.to_string(),
            },
        )
    }

    fn restore(&self, transaction_id: &str, product_id: &str) -> Result<()> {
        self.record(
            "restore",
            ListenerCall::Restore {
                transaction_id: transaction_id.to_string(),
                product_id: product_id.to_string(),
            },
        )
    }

    fn restore_completed(&self) -> Result<()> {
        self.record("restore_completed", ListenerCall::RestoreCompleted)
    }

    fn restore_failed(&self, code: i64) -> Result<()> {
        self.record("restore_failed", ListenerCall::RestoreFailed { code })
    }

    fn receipts_refreshed(&self, receipt: &ReceiptSnapshot) -> Result<()> {
        self.record(
            "receipts_refreshed",
            ListenerCall::ReceiptsRefreshed {
                bundle_identifier: receipt.bundle_identifier.clone(),
            },
        )
    }

    fn error(&self, error: &StoreError) -> Result<()> {
        self.record(
            "error",
            ListenerCall::Error {
                message: error.to_string(),
            },
        )
    }

    fn download_active(
        &self,
        transaction_id: &str,
        product_id: &str,
        progress: u8,
        time_remaining: f64,
    ) -> Result<()> {
        self.record(
            "download_active",
            ListenerCall::DownloadActive {
                transaction_id: transaction_id.to_string(),
                product_id: product_id.to_string(),
                progress,
                time_remaining,
            },
        )
    }

    fn download_cancelled(&self, transaction_id: &str, product_id: &str) -> Result<()> {
        self.record(
            "download_cancelled",
            ListenerCall::DownloadCancelled {
                transaction_id: transaction_id.to_string(),
                product_id: product_id.to_string(),
            },
        )
    }

    fn download_failed(
        &self,
        transaction_id: &str,
        product_id: &str,
        code: Option<i64>,
        message: Option<&str>,
    ) -> Result<()> {
        self.record(
            "download_failed",
            ListenerCall::DownloadFailed {
                transaction_id: transaction_id.to_string(),
                product_id: product_id.to_string(),
                code,
                message: message.map(str::to_string),
            },
        )
    }

    fn download_finished(&self, transaction_id: &str, product_id: &str) -> Result<()> {
        self.record(
            "download_finished",
            ListenerCall::DownloadFinished {
                transaction_id: transaction_id.to_string(),
                product_id: product_id.to_string(),
            },
        )
    }

    fn download_paused(&self, transaction_id: &str, product_id: &str) -> Result<()> {
        self.record(
            "download_paused",
            ListenerCall::DownloadPaused {
                transaction_id: transaction_id.to_string(),
                product_id: product_id.to_string(),
            },
        )
    }

    fn download_waiting(&self, transaction_id: &str, product_id: &str) -> Result<()> {
        self.record(
            "download_waiting",
            ListenerCall::DownloadWaiting {
                transaction_id: transaction_id.to_string(),
                product_id: product_id.to_string(),
            },
        )
    }
}
