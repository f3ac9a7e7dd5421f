//! The native transport boundary.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// Method names understood by the native payment layer.
pub mod method {
    pub const SETUP: &str = "setup";
    pub const PURCHASE: &str = "purchase";
    pub const RESTORE_COMPLETED_TRANSACTIONS: &str = "restoreCompletedTransactions";
    pub const FINISH_TRANSACTION: &str = "finishTransaction";
    pub const LOAD: &str = "load";
    pub const APP_STORE_RECEIPT: &str = "appStoreReceipt";
    pub const APP_STORE_REFRESH_RECEIPT: &str = "appStoreRefreshReceipt";
    pub const CAN_MAKE_PAYMENTS: &str = "canMakePayments";
    pub const PAUSE: &str = "pause";
    pub const RESUME: &str = "resume";
    pub const CANCEL: &str = "cancel";
    pub const MANAGE_SUBSCRIPTIONS: &str = "manageSubscriptions";
    pub const MANAGE_BILLING: &str = "manageBilling";
    pub const PRESENT_CODE_REDEMPTION_SHEET: &str = "presentCodeRedemptionSheet";
}

/// Error surfaced by the native layer for a rejected call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Abstract RPC channel into the native purchase subsystem.
///
/// One call is one request; the shape of the response value is
/// method-specific. Lifecycle events (transaction and download updates,
/// restore outcomes) do NOT arrive here: the native layer pushes those into
/// the engine's inbound entry points instead.
///
/// Also implemented for `Arc<T>` so tests can keep a handle on a scripted
/// transport after handing it to the engine.
#[async_trait]
pub trait NativeTransport: Send + Sync {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: NativeTransport + ?Sized> NativeTransport for Arc<T> {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, TransportError> {
        (**self).invoke(method, args).await
    }
}
