//! Integration tests for the file-backed store and the durable index.

use std::sync::Arc;

use storewire_ledger::{FileStore, KeyValueStore, TransactionIndex, INDEX_KEY};

fn store_in(dir: &tempfile::TempDir) -> FileStore {
    FileStore::new(dir.path().join("storewire.json"))
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

#[test]
fn file_store_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    assert_eq!(store.get("k").unwrap(), None);
    store.set("k", "v").unwrap();
    assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    store.delete("k").unwrap();
    assert_eq!(store.get("k").unwrap(), None);
}

#[test]
fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    store_in(&dir).set("k", "v").unwrap();

    let reopened = store_in(&dir);
    assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
}

#[test]
fn file_store_leaves_no_temp_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["storewire.json"]);
}

#[test]
fn missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert_eq!(store.get("anything").unwrap(), None);
    // Deleting from a store that was never written is fine too.
    store.delete("anything").unwrap();
    assert!(!dir.path().join("storewire.json").exists());
}

#[test]
fn file_store_keeps_unrelated_keys_on_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();
    store.delete("a").unwrap();

    assert_eq!(store.get("a").unwrap(), None);
    assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
}

// ---------------------------------------------------------------------------
// TransactionIndex over FileStore: survives a process restart
// ---------------------------------------------------------------------------

#[test]
fn index_survives_reconstruction_over_the_same_file() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut index = TransactionIndex::load(store_in(&dir));
        index.record("com.app.gold", "tx1");
        index.record("com.app.silver", "tx2");
        index.record("com.app.gold", "tx3");
    }

    let index = TransactionIndex::load(store_in(&dir));
    assert_eq!(index.transaction_for("com.app.gold"), Some("tx3"));
    assert_eq!(index.transaction_for("com.app.silver"), Some("tx2"));
    assert_eq!(index.len(), 2);
}

#[test]
fn index_blob_is_one_json_object_under_its_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(&dir));
    let mut index = TransactionIndex::load(Arc::clone(&store));
    index.record("com.app.gold", "tx1");

    let raw = store.get(INDEX_KEY).unwrap().expect("blob written");
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["com.app.gold"], "tx1");
}
