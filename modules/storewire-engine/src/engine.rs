//! The reconciliation engine.
//!
//! Owns the pending-event buffer, the durable product to transaction index,
//! the restore gate and the receipt snapshot. Inbound dispatch is
//! synchronous; only the native transport boundary suspends.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use storewire_common::{
    DownloadPhase, DownloadUpdate, LoadedProducts, ReceiptSnapshot, StoreError, TransactionPhase,
    TransactionUpdate,
};
use storewire_ledger::{KeyValueStore, TransactionIndex};

use crate::buffer::{PendingEventBuffer, ReplayTrigger};
use crate::listener::{NoopListener, StoreListener};
use crate::notify::notify;
use crate::restore::RestoreSession;
use crate::transport::{method, NativeTransport};

/// Engine lifecycle. `Ready` is entered once native setup succeeds; until
/// then every inbound event is buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
}

/// Configuration supplied at `init`. Replaced wholesale on re-init; there
/// is no partial update.
pub struct EngineConfig {
    pub listener: Arc<dyn StoreListener>,
    pub replay: ReplayTrigger,
}

impl EngineConfig {
    pub fn new(listener: Arc<dyn StoreListener>) -> Self {
        Self {
            listener,
            replay: ReplayTrigger::default(),
        }
    }

    pub fn with_replay(mut self, replay: ReplayTrigger) -> Self {
        self.replay = replay;
        self
    }
}

/// Reconciles native purchase/download lifecycle events with an application
/// listener that may register late.
pub struct Engine<T: NativeTransport, K: KeyValueStore> {
    transport: T,
    listener: Arc<dyn StoreListener>,
    lifecycle: Lifecycle,
    replay: ReplayTrigger,
    buffer: PendingEventBuffer,
    index: TransactionIndex<K>,
    restore: RestoreSession,
    receipt: Option<ReceiptSnapshot>,
    loaded_products: HashSet<String>,
}

impl<T: NativeTransport, K: KeyValueStore> Engine<T, K> {
    /// Construct the engine over a transport and a key-value store. The
    /// durable index is read here, once; events may start buffering
    /// immediately, before `init` is ever called.
    pub fn new(transport: T, store: K) -> Self {
        Self {
            transport,
            listener: Arc::new(NoopListener),
            lifecycle: Lifecycle::Uninitialized,
            replay: ReplayTrigger::default(),
            buffer: PendingEventBuffer::new(),
            index: TransactionIndex::load(store),
            restore: RestoreSession::new(),
            receipt: None,
            loaded_products: HashSet::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Run native setup and register the listener. On success the engine
    /// becomes `Ready` and, under `ReplayTrigger::OnInit`, replays
    /// everything buffered so far. On failure the lifecycle stays
    /// `Uninitialized`, events keep buffering, and `init` may be retried.
    pub async fn init(&mut self, config: EngineConfig) -> Result<(), StoreError> {
        self.listener = config.listener;
        self.replay = config.replay;

        match self.transport.invoke(method::SETUP, vec![]).await {
            Ok(_) => {
                debug!("setup ok");
                let listener = Arc::clone(&self.listener);
                notify("ready", || listener.ready());
                self.lifecycle = Lifecycle::Ready;
                if self.replay == ReplayTrigger::OnInit {
                    self.drain_pending();
                }
                Ok(())
            }
            Err(err) => {
                let err = StoreError::Setup {
                    message: err.to_string(),
                };
                self.report(&err);
                Err(err)
            }
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Re-attempt delivery of buffered events; the `Polled` replay path.
    /// Hosts call this from a coarse timer. Returns `true` once the buffer
    /// is empty, so the host can stop polling.
    pub fn redeliver(&mut self) -> bool {
        if self.lifecycle == Lifecycle::Ready {
            self.drain_pending();
        }
        self.buffer.is_empty()
    }

    /// Buffered events not yet delivered, across both families.
    pub fn pending_events(&self) -> usize {
        self.buffer.len()
    }

    // -----------------------------------------------------------------------
    // Inbound events (driven by the native layer)
    // -----------------------------------------------------------------------

    /// Inbound transaction lifecycle event.
    ///
    /// Buffered while the engine is not ready, or while earlier events of
    /// this family are still queued, so replay order is never overtaken by
    /// a live arrival.
    pub fn transaction_updated(&mut self, update: TransactionUpdate) {
        if self.lifecycle != Lifecycle::Ready || self.buffer.has_transactions() {
            self.buffer.push_transaction(update);
            return;
        }
        self.dispatch_transaction(update);
    }

    /// Inbound download lifecycle event. Same buffering rule as
    /// transactions, on the download queue.
    pub fn download_updated(&mut self, update: DownloadUpdate) {
        if self.lifecycle != Lifecycle::Ready || self.buffer.has_downloads() {
            self.buffer.push_download(update);
            return;
        }
        self.dispatch_download(update);
    }

    /// The native layer finished a restore round trip.
    pub fn restore_completed(&mut self) {
        if !self.restore.take_pending() {
            return;
        }
        let listener = Arc::clone(&self.listener);
        notify("restore_completed", || listener.restore_completed());
    }

    /// The native layer aborted a restore round trip.
    pub fn restore_failed(&mut self, code: i64) {
        if !self.restore.take_pending() {
            return;
        }
        let listener = Arc::clone(&self.listener);
        notify("restore_failed", || listener.restore_failed(code));
        self.report(&StoreError::RestoreFailed { code });
    }

    // -----------------------------------------------------------------------
    // Consumer-facing operations
    // -----------------------------------------------------------------------

    /// Begin a purchase. Native success only means the request was
    /// enqueued; completion arrives later as a transaction event. Guarded:
    /// a product id that was never part of a successful `load` is rejected
    /// without touching the transport.
    pub async fn purchase(
        &mut self,
        product_id: &str,
        quantity: u32,
        application_username: Option<&str>,
        discount: Option<Value>,
    ) -> Result<(), StoreError> {
        let quantity = quantity.max(1);

        if !self.loaded_products.contains(product_id) {
            warn!(product_id, "purchase attempted for a product that was never loaded");
            let err = StoreError::UnknownProduct {
                product_id: product_id.to_string(),
                quantity,
            };
            self.report(&err);
            return Err(err);
        }

        let args = vec![
            json!(product_id),
            json!(quantity),
            json!(application_username),
            discount.unwrap_or_else(|| json!({})),
        ];
        match self.transport.invoke(method::PURCHASE, args).await {
            Ok(_) => {
                debug!(product_id, quantity, "purchase enqueued");
                let listener = Arc::clone(&self.listener);
                notify("purchase_enqueued", || {
                    listener.purchase_enqueued(product_id, quantity)
                });
                Ok(())
            }
            Err(err) => {
                let err = StoreError::PurchaseFailed {
                    product_id: product_id.to_string(),
                    quantity,
                    message: err.to_string(),
                };
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Ask the payment queue to re-deliver previously completed
    /// transactions. Each restored transaction arrives as a `Restored`
    /// event; the round trip ends with exactly one
    /// `restore_completed`/`restore_failed` notification.
    pub async fn restore(&mut self) {
        self.restore.begin();
        if let Err(err) = self
            .transport
            .invoke(method::RESTORE_COMPLETED_TRANSACTIONS, vec![])
            .await
        {
            warn!(%err, "restore request failed");
        }
    }

    /// Finish a transaction. Fire-and-forget; the payment queue
    /// acknowledges with a `Finished` event.
    pub async fn finish(&mut self, transaction_id: &str) {
        let args = vec![json!(transaction_id)];
        if let Err(err) = self.transport.invoke(method::FINISH_TRANSACTION, args).await {
            warn!(transaction_id, %err, "finishTransaction failed");
        }
    }

    /// Load localized catalog data. The ids of a successful load become the
    /// set the pre-purchase guard accepts.
    pub async fn load(&mut self, product_ids: &[String]) -> Result<LoadedProducts, StoreError> {
        if product_ids.is_empty() {
            return Ok(LoadedProducts::default());
        }
        if product_ids.iter().any(|id| id.trim().is_empty()) {
            let err = StoreError::MalformedLoad {
                message: format!("blank product id in {product_ids:?}"),
            };
            self.report(&err);
            return Err(err);
        }

        debug!(?product_ids, "loading products");
        let args = vec![json!(product_ids)];
        match self.transport.invoke(method::LOAD, args).await {
            Ok(value) => {
                let Some(loaded) = LoadedProducts::from_wire(&value) else {
                    let err = StoreError::LoadFailed {
                        message: "malformed load response".to_string(),
                    };
                    self.report(&err);
                    return Err(err);
                };
                self.loaded_products = product_ids.iter().cloned().collect();
                debug!(
                    valid = loaded.products.len(),
                    invalid = loaded.invalid_ids.len(),
                    "load ok"
                );
                Ok(loaded)
            }
            Err(err) => {
                let err = StoreError::LoadFailed {
                    message: err.to_string(),
                };
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Refresh the receipt from the store. The snapshot is cleared first,
    /// so `receipt()` reads `None` while the refresh is outstanding.
    pub async fn refresh_receipts(&mut self) -> Result<ReceiptSnapshot, StoreError> {
        self.receipt = None;
        debug!("refreshing receipt");
        match self
            .transport
            .invoke(method::APP_STORE_REFRESH_RECEIPT, vec![])
            .await
        {
            Ok(value) => match ReceiptSnapshot::from_wire(&value) {
                Some(snapshot) => {
                    self.receipt = Some(snapshot.clone());
                    let listener = Arc::clone(&self.listener);
                    notify("receipts_refreshed", || {
                        listener.receipts_refreshed(&snapshot)
                    });
                    Ok(snapshot)
                }
                None => {
                    let err = StoreError::ReceiptRefresh {
                        message: "malformed receipt payload".to_string(),
                    };
                    self.report(&err);
                    Err(err)
                }
            },
            Err(err) => {
                let err = StoreError::ReceiptRefresh {
                    message: err.to_string(),
                };
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Read the current receipt without forcing a refresh. A passive read:
    /// the snapshot is not cleared first and `receipts_refreshed` does not
    /// fire.
    pub async fn load_receipts(&mut self) -> Result<ReceiptSnapshot, StoreError> {
        debug!("loading receipt");
        match self.transport.invoke(method::APP_STORE_RECEIPT, vec![]).await {
            Ok(value) => match ReceiptSnapshot::from_wire(&value) {
                Some(snapshot) => {
                    self.receipt = Some(snapshot.clone());
                    Ok(snapshot)
                }
                None => {
                    let err = StoreError::ReceiptLoad {
                        message: "malformed receipt payload".to_string(),
                    };
                    self.report(&err);
                    Err(err)
                }
            },
            Err(err) => {
                let err = StoreError::ReceiptLoad {
                    message: err.to_string(),
                };
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Whether the device/user may make payments. A transport rejection
    /// reads as "no".
    pub async fn can_make_payments(&self) -> bool {
        match self
            .transport
            .invoke(method::CAN_MAKE_PAYMENTS, vec![])
            .await
        {
            Ok(_) => true,
            Err(err) => {
                debug!(%err, "canMakePayments rejected");
                false
            }
        }
    }

    /// Pause all active downloads.
    pub async fn pause(&mut self) -> Result<(), StoreError> {
        self.download_control(method::PAUSE, "Pausing active downloads failed")
            .await
    }

    /// Resume all paused downloads.
    pub async fn resume(&mut self) -> Result<(), StoreError> {
        self.download_control(method::RESUME, "Resuming active downloads failed")
            .await
    }

    /// Cancel all active downloads.
    pub async fn cancel_downloads(&mut self) -> Result<(), StoreError> {
        self.download_control(method::CANCEL, "Cancelling active downloads failed")
            .await
    }

    /// Present the subscription management sheet. Fire-and-forget.
    pub async fn manage_subscriptions(&self) {
        self.fire_and_forget(method::MANAGE_SUBSCRIPTIONS).await;
    }

    /// Present the billing management sheet. Fire-and-forget.
    pub async fn manage_billing(&self) {
        self.fire_and_forget(method::MANAGE_BILLING).await;
    }

    /// Present the offer-code redemption sheet. Fire-and-forget.
    pub async fn present_code_redemption_sheet(&self) {
        self.fire_and_forget(method::PRESENT_CODE_REDEMPTION_SHEET).await;
    }

    // -----------------------------------------------------------------------
    // Read-only state
    // -----------------------------------------------------------------------

    /// The current receipt snapshot; `None` until a load/refresh succeeds
    /// and while a refresh is outstanding.
    pub fn receipt(&self) -> Option<&ReceiptSnapshot> {
        self.receipt.as_ref()
    }

    /// The most recent in-flight transaction id recorded for a product.
    pub fn transaction_for_product(&self, product_id: &str) -> Option<&str> {
        self.index.transaction_for(product_id)
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Replay buffered events in arrival order, transactions first. Each
    /// family is snapshot-drained, so anything arriving mid-replay lands in
    /// a fresh queue for the next drain.
    fn drain_pending(&mut self) {
        for update in self.buffer.drain_transactions() {
            self.dispatch_transaction(update);
        }
        for update in self.buffer.drain_downloads() {
            self.dispatch_download(update);
        }
    }

    fn dispatch_transaction(&mut self, update: TransactionUpdate) {
        if let (Some(product_id), Some(transaction_id)) =
            (&update.product_id, &update.transaction_id)
        {
            self.index.record(product_id, transaction_id);
        }

        let Some(phase) = TransactionPhase::from_tag(&update.state) else {
            debug!(state = %update.state, "ignoring unrecognized transaction state");
            return;
        };

        let listener = Arc::clone(&self.listener);
        let transaction_id = update.transaction_id.as_deref().unwrap_or_default();
        let product_id = update.product_id.as_deref().unwrap_or_default();
        match phase {
            TransactionPhase::Purchasing => {
                notify("purchasing", || listener.purchasing(product_id));
            }
            TransactionPhase::Purchased => {
                notify("purchase", || {
                    listener.purchase(
                        transaction_id,
                        product_id,
                        update.original_transaction_id.as_deref(),
                    )
                });
            }
            TransactionPhase::Deferred => {
                notify("deferred", || listener.deferred(product_id));
            }
            TransactionPhase::Failed => {
                self.report(&StoreError::Transaction {
                    code: update.error_code,
                    message: update.error_text.clone(),
                    product_id: update.product_id.clone(),
                });
            }
            TransactionPhase::Restored => {
                notify("restore", || listener.restore(transaction_id, product_id));
            }
            TransactionPhase::Finished => {
                notify("finish", || listener.finish(transaction_id, product_id));
            }
        }
    }

    fn dispatch_download(&mut self, update: DownloadUpdate) {
        let Some(phase) = DownloadPhase::from_tag(&update.state) else {
            debug!(state = %update.state, "ignoring unrecognized download state");
            return;
        };

        let listener = Arc::clone(&self.listener);
        let transaction_id = update.transaction_id.as_deref().unwrap_or_default();
        let product_id = update.product_id.as_deref().unwrap_or_default();
        match phase {
            DownloadPhase::Active => {
                notify("download_active", || {
                    listener.download_active(
                        transaction_id,
                        product_id,
                        update.progress,
                        update.time_remaining,
                    )
                });
            }
            DownloadPhase::Cancelled => {
                notify("download_cancelled", || {
                    listener.download_cancelled(transaction_id, product_id)
                });
            }
            DownloadPhase::Failed => {
                notify("download_failed", || {
                    listener.download_failed(
                        transaction_id,
                        product_id,
                        update.error_code,
                        update.error_text.as_deref(),
                    )
                });
            }
            DownloadPhase::Finished => {
                notify("download_finished", || {
                    listener.download_finished(transaction_id, product_id)
                });
            }
            DownloadPhase::Paused => {
                notify("download_paused", || {
                    listener.download_paused(transaction_id, product_id)
                });
            }
            DownloadPhase::Waiting => {
                notify("download_waiting", || {
                    listener.download_waiting(transaction_id, product_id)
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// First reporting channel: the listener's `error` hook. The second is
    /// the `Err` return of the operation that failed, where it has one.
    fn report(&self, error: &StoreError) {
        let listener = Arc::clone(&self.listener);
        notify("error", || listener.error(error));
    }

    async fn download_control(&mut self, name: &str, failure: &str) -> Result<(), StoreError> {
        match self.transport.invoke(name, vec![]).await {
            Ok(_) => {
                debug!(method = name, "download control ok");
                Ok(())
            }
            Err(err) => {
                let err = StoreError::Download {
                    message: format!("{failure}: {err}"),
                };
                self.report(&err);
                Err(err)
            }
        }
    }

    async fn fire_and_forget(&self, name: &str) {
        if let Err(err) = self.transport.invoke(name, vec![]).await {
            warn!(method = name, %err, "native call failed");
        }
    }
}
