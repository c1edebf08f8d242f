//! Append-only event store boundary.
//!
//! The persistence collaborator: event streams keyed by aggregate id, committed
//! atomically across streams with a per-stream version check.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};
