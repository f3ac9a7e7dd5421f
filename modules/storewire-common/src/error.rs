use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The closed set of failures the engine reports.
///
/// Every externally-caused failure surfaces as exactly one of these, routed
/// to the listener's `error` hook and, where the operation has one, the
/// `Err` return of the consumer-facing call. None of them is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Setup failed: {message}")]
    Setup { message: String },

    /// Purchase attempted for a product id never part of a successful load.
    #[error("Purchasing {product_id} failed: the product was never loaded")]
    UnknownProduct { product_id: String, quantity: u32 },

    #[error("Purchasing {product_id} failed: {message}")]
    PurchaseFailed {
        product_id: String,
        quantity: u32,
        message: String,
    },

    /// `load` was called with ids that cannot be sent over the wire.
    #[error("Invalid product ids given to load: {message}")]
    MalformedLoad { message: String },

    #[error("Load failed: {message}")]
    LoadFailed { message: String },

    /// A transaction reached the Failed state in the payment queue.
    #[error("Transaction failed (code {code:?}): {message:?}")]
    Transaction {
        code: Option<i64>,
        message: Option<String>,
        product_id: Option<String>,
    },

    #[error("{message}")]
    Download { message: String },

    #[error("Failed to refresh receipt: {message}")]
    ReceiptRefresh { message: String },

    #[error("Failed to load receipt: {message}")]
    ReceiptLoad { message: String },

    /// The payment queue reported a failed restore round trip.
    #[error("Restore failed (code {code})")]
    RestoreFailed { code: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_error_carries_native_message() {
        let err = StoreError::ReceiptRefresh {
            message: "network down".into(),
        };
        assert_eq!(err.to_string(), "Failed to refresh receipt: network down");
    }

    #[test]
    fn unknown_product_names_the_product() {
        let err = StoreError::UnknownProduct {
            product_id: "com.app.gold".into(),
            quantity: 1,
        };
        assert!(err.to_string().contains("com.app.gold"));
    }
}
