//! Durable state for the storewire engine.
//!
//! A small key-value boundary (`KeyValueStore`) with a file-backed
//! production impl and an in-memory test impl, plus the one durable
//! collection the engine keeps: the product to transaction index.

pub mod index;
pub mod kv;

pub use index::{TransactionIndex, INDEX_KEY, LEGACY_RECEIPT_KEY};
pub use kv::{FileStore, KeyValueStore, MemoryStore, StorageError};
