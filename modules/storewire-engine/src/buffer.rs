//! Pre-readiness event buffering.

use std::collections::VecDeque;
use std::mem;

use storewire_common::{DownloadUpdate, TransactionUpdate};

/// When buffered events get replayed.
///
/// One buffer, one trigger: this replaces the pair of queuing mechanisms a
/// host would otherwise need (an init-time drain plus a timer-driven
/// re-delivery sweep).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayTrigger {
    /// Drain the moment setup succeeds.
    #[default]
    OnInit,
    /// Drain only on explicit `Engine::redeliver` calls, which the host
    /// drives from a coarse timer and stops once the buffer reports empty.
    Polled,
}

/// FIFO queues for events that arrived before the engine could dispatch
/// them. One queue per family, so a replay never interleaves transaction
/// and download events with each other.
#[derive(Debug, Default)]
pub struct PendingEventBuffer {
    transactions: VecDeque<TransactionUpdate>,
    downloads: VecDeque<DownloadUpdate>,
}

impl PendingEventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_transaction(&mut self, update: TransactionUpdate) {
        self.transactions.push_back(update);
    }

    pub fn push_download(&mut self, update: DownloadUpdate) {
        self.downloads.push_back(update);
    }

    /// Take the queued transaction events, leaving a fresh queue behind so
    /// events arriving mid-replay are neither lost nor replayed twice.
    pub fn drain_transactions(&mut self) -> VecDeque<TransactionUpdate> {
        mem::take(&mut self.transactions)
    }

    /// Same snapshot-and-swap for the download family.
    pub fn drain_downloads(&mut self) -> VecDeque<DownloadUpdate> {
        mem::take(&mut self.downloads)
    }

    pub fn has_transactions(&self) -> bool {
        !self.transactions.is_empty()
    }

    pub fn has_downloads(&self) -> bool {
        !self.downloads.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.downloads.is_empty()
    }

    /// Buffered events across both families.
    pub fn len(&self) -> usize {
        self.transactions.len() + self.downloads.len()
    }
}
