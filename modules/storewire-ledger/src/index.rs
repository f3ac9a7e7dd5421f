//! The durable product to transaction index.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::kv::KeyValueStore;

/// Storage key holding the serialized index.
pub const INDEX_KEY: &str = "transaction_for_product";

/// Key from an older storage layout that kept a receipt per transaction.
/// Dropped at load time when still present.
pub const LEGACY_RECEIPT_KEY: &str = "receipt_for_transaction";

/// Maps product id to the most recent in-flight transaction id for it.
///
/// Last writer wins and entries are never removed; the mapping exists for
/// diagnostic correlation, so a failed persist downgrades to a warning
/// rather than aborting dispatch.
#[derive(Debug)]
pub struct TransactionIndex<K: KeyValueStore> {
    store: K,
    map: HashMap<String, String>,
}

impl<K: KeyValueStore> TransactionIndex<K> {
    /// Load the index from storage. Unreadable or malformed state starts
    /// empty instead of failing construction.
    pub fn load(store: K) -> Self {
        if let Err(err) = store.delete(LEGACY_RECEIPT_KEY) {
            warn!(%err, "could not drop legacy receipt key");
        }
        let map = match store.get(INDEX_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(%err, "transaction index unreadable, starting empty");
                HashMap::new()
            }),
            Ok(None) => HashMap::new(),
            Err(err) => {
                warn!(%err, "transaction index unavailable, starting empty");
                HashMap::new()
            }
        };
        Self { store, map }
    }

    /// Record an in-flight transaction for a product and persist the whole
    /// index. Last write wins.
    pub fn record(&mut self, product_id: &str, transaction_id: &str) {
        debug!(product_id, transaction_id, "transaction in progress");
        self.map
            .insert(product_id.to_string(), transaction_id.to_string());
        self.persist();
    }

    pub fn transaction_for(&self, product_id: &str) -> Option<&str> {
        self.map.get(product_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn persist(&self) {
        let raw = match serde_json::to_string(&self.map) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "could not serialize transaction index");
                return;
            }
        };
        if let Err(err) = self.store.set(INDEX_KEY, &raw) {
            warn!(%err, "could not persist transaction index");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::kv::MemoryStore;

    #[test]
    fn records_and_reads_back() {
        let mut index = TransactionIndex::load(MemoryStore::new());
        index.record("com.app.gold", "tx1");
        assert_eq!(index.transaction_for("com.app.gold"), Some("tx1"));
        assert_eq!(index.transaction_for("com.app.silver"), None);
    }

    #[test]
    fn last_write_wins() {
        let mut index = TransactionIndex::load(MemoryStore::new());
        index.record("com.app.gold", "tx1");
        index.record("com.app.gold", "tx2");
        assert_eq!(index.transaction_for("com.app.gold"), Some("tx2"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn persists_on_every_record() {
        let store = Arc::new(MemoryStore::new());
        let mut index = TransactionIndex::load(Arc::clone(&store));
        index.record("com.app.gold", "tx1");

        let raw = store.get(INDEX_KEY).unwrap().expect("index persisted");
        let map: HashMap<String, String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(map.get("com.app.gold").map(String::as_str), Some("tx1"));
    }

    #[test]
    fn reloads_from_the_same_store() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut index = TransactionIndex::load(Arc::clone(&store));
            index.record("com.app.gold", "tx1");
        }
        let index = TransactionIndex::load(store);
        assert_eq!(index.transaction_for("com.app.gold"), Some("tx1"));
    }

    #[test]
    fn malformed_blob_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(INDEX_KEY, "not json").unwrap();
        let index = TransactionIndex::load(store);
        assert!(index.is_empty());
    }

    #[test]
    fn legacy_receipt_key_dropped_on_load() {
        let store = Arc::new(MemoryStore::new());
        store.set(LEGACY_RECEIPT_KEY, "{}").unwrap();
        let _index = TransactionIndex::load(Arc::clone(&store));
        assert_eq!(store.get(LEGACY_RECEIPT_KEY).unwrap(), None);
    }
}
