//! Purchase and download event reconciliation engine.
//!
//! Sits between a native payment queue and application listeners that may
//! register late. Events that arrive before initialization are buffered and
//! replayed in arrival order once setup succeeds; dispatch routes every
//! consumer notification through a harness that contains listener failures,
//! so a buggy hook can never break the dispatch loop.
//!
//! The engine owns all of its state behind `&mut self`: single-threaded by
//! construction, with suspension only at the async transport boundary.

pub mod buffer;
pub mod engine;
pub mod listener;
pub mod notify;
pub mod restore;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod transport;

pub use buffer::{PendingEventBuffer, ReplayTrigger};
pub use engine::{Engine, EngineConfig, Lifecycle};
pub use listener::{NoopListener, StoreListener};
pub use notify::{notify, NotifyOutcome};
pub use restore::RestoreSession;
pub use transport::{method, NativeTransport, TransportError};
