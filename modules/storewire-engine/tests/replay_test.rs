//! Buffering and replay properties: pre-init sequences replay in arrival
//! order with no gaps or duplicates, faulty hooks cannot interrupt a drain,
//! and the polled replay path holds events until the host asks.

use std::sync::Arc;

use storewire_common::{DownloadUpdate, TransactionPhase, TransactionUpdate};
use storewire_engine::testing::{ListenerCall, RecordingListener, ScriptedTransport};
use storewire_engine::{Engine, EngineConfig, ReplayTrigger};
use storewire_ledger::MemoryStore;

type TestEngine = Engine<Arc<ScriptedTransport>, MemoryStore>;

fn fresh_engine() -> TestEngine {
    Engine::new(Arc::new(ScriptedTransport::new()), MemoryStore::new())
}

fn purchasing(product_id: &str) -> TransactionUpdate {
    TransactionUpdate::new(TransactionPhase::Purchasing.as_tag()).with_product(product_id)
}

fn purchased(transaction_id: &str, product_id: &str) -> TransactionUpdate {
    TransactionUpdate::new(TransactionPhase::Purchased.as_tag())
        .with_transaction(transaction_id)
        .with_product(product_id)
}

// ---------------------------------------------------------------------------
// Replay ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pre_init_events_replay_in_arrival_order() {
    let mut engine = fresh_engine();
    let listener = Arc::new(RecordingListener::new());

    engine.transaction_updated(purchasing("com.app.gold"));
    engine.transaction_updated(purchased("tx1", "com.app.gold"));
    assert_eq!(engine.pending_events(), 2);

    engine
        .init(EngineConfig::new(listener.clone()))
        .await
        .unwrap();

    assert_eq!(
        listener.calls(),
        vec![
            ListenerCall::Ready,
            ListenerCall::Purchasing {
                product_id: "com.app.gold".into()
            },
            ListenerCall::Purchase {
                transaction_id: "tx1".into(),
                product_id: "com.app.gold".into(),
                original_transaction_id: None,
            },
        ]
    );
    assert_eq!(engine.pending_events(), 0);
}

#[tokio::test]
async fn replay_happens_exactly_once() {
    let mut engine = fresh_engine();
    let listener = Arc::new(RecordingListener::new());

    engine.transaction_updated(purchased("tx1", "com.app.gold"));
    engine
        .init(EngineConfig::new(listener.clone()))
        .await
        .unwrap();

    // A later redeliver sweep finds nothing to do.
    assert!(engine.redeliver());

    let purchases = listener
        .calls()
        .into_iter()
        .filter(|call| matches!(call, ListenerCall::Purchase { .. }))
        .count();
    assert_eq!(purchases, 1);
}

#[tokio::test]
async fn live_events_after_the_drain_dispatch_immediately() {
    let mut engine = fresh_engine();
    let listener = Arc::new(RecordingListener::new());

    engine.transaction_updated(purchasing("com.app.gold"));
    engine
        .init(EngineConfig::new(listener.clone()))
        .await
        .unwrap();

    engine.transaction_updated(purchased("tx1", "com.app.gold"));

    assert_eq!(engine.pending_events(), 0);
    let calls = listener.calls();
    assert_eq!(
        calls.last(),
        Some(&ListenerCall::Purchase {
            transaction_id: "tx1".into(),
            product_id: "com.app.gold".into(),
            original_transaction_id: None,
        })
    );
}

#[tokio::test]
async fn families_replay_independently_without_interleaving() {
    let mut engine = fresh_engine();
    let listener = Arc::new(RecordingListener::new());

    engine.download_updated(
        DownloadUpdate::new("DownloadStateWaiting").with_ids("tx1", "com.app.pack"),
    );
    engine.transaction_updated(purchased("tx1", "com.app.pack"));

    engine
        .init(EngineConfig::new(listener.clone()))
        .await
        .unwrap();

    // Transactions drain as one family, downloads as the other.
    assert_eq!(
        listener.calls(),
        vec![
            ListenerCall::Ready,
            ListenerCall::Purchase {
                transaction_id: "tx1".into(),
                product_id: "com.app.pack".into(),
                original_transaction_id: None,
            },
            ListenerCall::DownloadWaiting {
                transaction_id: "tx1".into(),
                product_id: "com.app.pack".into(),
            },
        ]
    );
}

#[tokio::test]
async fn unrecognized_buffered_tag_is_dropped_during_replay() {
    let mut engine = fresh_engine();
    let listener = Arc::new(RecordingListener::new());

    engine.transaction_updated(TransactionUpdate::new("PaymentTransactionStateTeleported"));
    engine.transaction_updated(purchased("tx1", "com.app.gold"));

    engine
        .init(EngineConfig::new(listener.clone()))
        .await
        .unwrap();

    assert_eq!(
        listener.calls(),
        vec![
            ListenerCall::Ready,
            ListenerCall::Purchase {
                transaction_id: "tx1".into(),
                product_id: "com.app.gold".into(),
                original_transaction_id: None,
            },
        ]
    );
}

// ---------------------------------------------------------------------------
// Harness containment during a drain
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_hook_does_not_stop_the_drain() {
    let mut engine = fresh_engine();
    let listener = Arc::new(RecordingListener::new().fail_on("purchasing"));

    engine.transaction_updated(purchasing("com.app.gold"));
    engine.transaction_updated(purchased("tx1", "com.app.gold"));

    engine
        .init(EngineConfig::new(listener.clone()))
        .await
        .unwrap();

    // Both hooks were reached, in order, despite the first one failing.
    assert_eq!(
        listener.calls(),
        vec![
            ListenerCall::Ready,
            ListenerCall::Purchasing {
                product_id: "com.app.gold".into()
            },
            ListenerCall::Purchase {
                transaction_id: "tx1".into(),
                product_id: "com.app.gold".into(),
                original_transaction_id: None,
            },
        ]
    );
}

#[tokio::test]
async fn panicking_hook_does_not_stop_the_drain() {
    let mut engine = fresh_engine();
    let listener = Arc::new(RecordingListener::new().panic_on("purchasing"));

    engine.transaction_updated(purchasing("com.app.gold"));
    engine.transaction_updated(purchased("tx1", "com.app.gold"));

    engine
        .init(EngineConfig::new(listener.clone()))
        .await
        .unwrap();

    assert!(listener.calls().contains(&ListenerCall::Purchase {
        transaction_id: "tx1".into(),
        product_id: "com.app.gold".into(),
        original_transaction_id: None,
    }));
}

// ---------------------------------------------------------------------------
// Polled replay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn polled_replay_holds_events_until_redeliver() {
    let mut engine = fresh_engine();
    let listener = Arc::new(RecordingListener::new());

    engine.transaction_updated(purchasing("com.app.gold"));

    engine
        .init(EngineConfig::new(listener.clone()).with_replay(ReplayTrigger::Polled))
        .await
        .unwrap();

    // Ready fired, but the buffer was not drained.
    assert_eq!(listener.calls(), vec![ListenerCall::Ready]);
    assert_eq!(engine.pending_events(), 1);

    // A live arrival may not overtake the queue: it appends instead.
    engine.transaction_updated(purchased("tx1", "com.app.gold"));
    assert_eq!(engine.pending_events(), 2);
    assert_eq!(listener.calls(), vec![ListenerCall::Ready]);

    // The host's sweep delivers everything in order and reports empty.
    assert!(engine.redeliver());
    assert_eq!(
        listener.calls(),
        vec![
            ListenerCall::Ready,
            ListenerCall::Purchasing {
                product_id: "com.app.gold".into()
            },
            ListenerCall::Purchase {
                transaction_id: "tx1".into(),
                product_id: "com.app.gold".into(),
                original_transaction_id: None,
            },
        ]
    );

    // Nothing left; the host can stop its timer.
    assert!(engine.redeliver());
    assert_eq!(listener.calls().len(), 3);
}

#[tokio::test]
async fn redeliver_before_ready_reports_not_empty_and_delivers_nothing() {
    let mut engine = fresh_engine();

    engine.transaction_updated(purchasing("com.app.gold"));
    assert!(!engine.redeliver());
    assert_eq!(engine.pending_events(), 1);
}
