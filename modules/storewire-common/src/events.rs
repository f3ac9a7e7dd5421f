//! Raw inbound event tuples and the per-family state vocabularies.
//!
//! The native payment queue pushes updates as positional tuples with a
//! string state tag. Updates are kept unparsed so pre-readiness buffering
//! stores exactly what arrived; the tag is interpreted at dispatch time.

use serde::{Deserialize, Serialize};

/// One raw transaction callback from the native layer: the seven positional
/// fields, unparsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub state: String,
    pub error_code: Option<i64>,
    pub error_text: Option<String>,
    pub transaction_id: Option<String>,
    pub product_id: Option<String>,
    pub receipt: Option<String>,
    pub original_transaction_id: Option<String>,
}

impl TransactionUpdate {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            ..Self::default()
        }
    }

    pub fn with_transaction(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = Some(id.into());
        self
    }

    pub fn with_product(mut self, id: impl Into<String>) -> Self {
        self.product_id = Some(id.into());
        self
    }

    pub fn with_original(mut self, id: impl Into<String>) -> Self {
        self.original_transaction_id = Some(id.into());
        self
    }

    pub fn with_receipt(mut self, receipt: impl Into<String>) -> Self {
        self.receipt = Some(receipt.into());
        self
    }

    pub fn with_error(mut self, code: i64, text: impl Into<String>) -> Self {
        self.error_code = Some(code);
        self.error_text = Some(text.into());
        self
    }
}

/// One raw download callback from the native layer: eight positional fields.
///
/// Download records are transient; nothing beyond this tuple is retained
/// once dispatch returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadUpdate {
    pub state: String,
    pub error_code: Option<i64>,
    pub error_text: Option<String>,
    pub transaction_id: Option<String>,
    pub product_id: Option<String>,
    pub receipt: Option<String>,
    /// Completion percentage, 0 to 100.
    pub progress: u8,
    /// Estimated seconds until the download finishes.
    pub time_remaining: f64,
}

impl DownloadUpdate {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            ..Self::default()
        }
    }

    pub fn with_ids(mut self, transaction_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_progress(mut self, progress: u8, time_remaining: f64) -> Self {
        self.progress = progress;
        self.time_remaining = time_remaining;
        self
    }

    pub fn with_error(mut self, code: i64, text: impl Into<String>) -> Self {
        self.error_code = Some(code);
        self.error_text = Some(text.into());
        self
    }
}

/// Transaction lifecycle states, parsed from the wire tag.
///
/// `Purchasing` waits for a follow-up event from the native layer; every
/// other state is terminal for this dispatcher. An unrecognized tag parses
/// to `None` and the caller drops the update: the explicit no-op arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPhase {
    Purchasing,
    Purchased,
    Deferred,
    Failed,
    Restored,
    Finished,
}

impl TransactionPhase {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "PaymentTransactionStatePurchasing" => Some(Self::Purchasing),
            "PaymentTransactionStatePurchased" => Some(Self::Purchased),
            "PaymentTransactionStateDeferred" => Some(Self::Deferred),
            "PaymentTransactionStateFailed" => Some(Self::Failed),
            "PaymentTransactionStateRestored" => Some(Self::Restored),
            "PaymentTransactionStateFinished" => Some(Self::Finished),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Purchasing => "PaymentTransactionStatePurchasing",
            Self::Purchased => "PaymentTransactionStatePurchased",
            Self::Deferred => "PaymentTransactionStateDeferred",
            Self::Failed => "PaymentTransactionStateFailed",
            Self::Restored => "PaymentTransactionStateRestored",
            Self::Finished => "PaymentTransactionStateFinished",
        }
    }
}

/// Download states. A flat set; the native layer owns transition order and
/// this side is a pure fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Waiting,
    Active,
    Paused,
    Cancelled,
    Failed,
    Finished,
}

impl DownloadPhase {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "DownloadStateWaiting" => Some(Self::Waiting),
            "DownloadStateActive" => Some(Self::Active),
            "DownloadStatePaused" => Some(Self::Paused),
            "DownloadStateCancelled" => Some(Self::Cancelled),
            "DownloadStateFailed" => Some(Self::Failed),
            "DownloadStateFinished" => Some(Self::Finished),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Waiting => "DownloadStateWaiting",
            Self::Active => "DownloadStateActive",
            Self::Paused => "DownloadStatePaused",
            Self::Cancelled => "DownloadStateCancelled",
            Self::Failed => "DownloadStateFailed",
            Self::Finished => "DownloadStateFinished",
        }
    }
}
