//! Consumer-facing notification hooks.

use anyhow::Result;

use storewire_common::{ReceiptSnapshot, StoreError};

/// Application hooks for purchase, download, restore and receipt events.
///
/// Every hook defaults to a no-op, so a consumer implements only what it
/// cares about; registering a listener can never leave a hole dispatch has
/// to check for. Hooks return `Result` so application failures have a
/// channel; the notification harness logs and swallows them (panics
/// included) and dispatch carries on.
pub trait StoreListener: Send + Sync {
    /// Native setup succeeded; the engine is about to replay buffered events.
    fn ready(&self) -> Result<()> {
        Ok(())
    }

    /// A purchase entered the payment queue and is in progress.
    fn purchasing(&self, _product_id: &str) -> Result<()> {
        Ok(())
    }

    /// A purchase completed. `original_transaction_id` is set for renewals
    /// and re-purchases of the same underlying transaction.
    fn purchase(
        &self,
        _transaction_id: &str,
        _product_id: &str,
        _original_transaction_id: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }

    /// The native layer accepted a purchase request. Enqueued, not complete:
    /// the outcome arrives later as a transaction event.
    fn purchase_enqueued(&self, _product_id: &str, _quantity: u32) -> Result<()> {
        Ok(())
    }

    /// A purchase was deferred, e.g. pending family approval.
    fn deferred(&self, _product_id: &str) -> Result<()> {
        Ok(())
    }

    /// A transaction was finished and removed from the payment queue.
    fn finish(&self, _transaction_id: &str, _product_id: &str) -> Result<()> {
        Ok(())
    }

    /// One previously completed transaction was re-delivered by a restore.
    fn restore(&self, _transaction_id: &str, _product_id: &str) -> Result<()> {
        Ok(())
    }

    fn restore_completed(&self) -> Result<()> {
        Ok(())
    }

    fn restore_failed(&self, _code: i64) -> Result<()> {
        Ok(())
    }

    /// A receipt refresh completed and the snapshot was replaced.
    fn receipts_refreshed(&self, _receipt: &ReceiptSnapshot) -> Result<()> {
        Ok(())
    }

    /// Any reported failure; see `StoreError` for the closed set of kinds.
    fn error(&self, _error: &StoreError) -> Result<()> {
        Ok(())
    }

    fn download_active(
        &self,
        _transaction_id: &str,
        _product_id: &str,
        _progress: u8,
        _time_remaining: f64,
    ) -> Result<()> {
        Ok(())
    }

    fn download_cancelled(&self, _transaction_id: &str, _product_id: &str) -> Result<()> {
        Ok(())
    }

    fn download_failed(
        &self,
        _transaction_id: &str,
        _product_id: &str,
        _code: Option<i64>,
        _message: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }

    fn download_finished(&self, _transaction_id: &str, _product_id: &str) -> Result<()> {
        Ok(())
    }

    fn download_paused(&self, _transaction_id: &str, _product_id: &str) -> Result<()> {
        Ok(())
    }

    fn download_waiting(&self, _transaction_id: &str, _product_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Listener with every hook left at its default. The engine starts with
/// this until `init` supplies the real one.
#[derive(Debug, Default)]
pub struct NoopListener;

impl StoreListener for NoopListener {}
