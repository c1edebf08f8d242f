use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use procura_core::AggregateId;

use super::r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend};

/// In-memory append-only event store.
///
/// Intended for tests/dev. A single write lock covers the whole commit, which
/// makes the multi-stream version check and write one atomic step.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<AggregateId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: Option<&Vec<StoredEvent>>) -> u64 {
        stream
            .and_then(|s| s.last())
            .map(|e| e.sequence_number)
            .unwrap_or(0)
    }

    fn validate_batch(appends: &[StreamAppend]) -> Result<(), EventStoreError> {
        let mut seen = HashSet::new();
        for append in appends {
            if !seen.insert(append.aggregate_id) {
                return Err(EventStoreError::InvalidAppend(format!(
                    "stream {} appears twice in one commit",
                    append.aggregate_id
                )));
            }
            for (idx, e) in append.events.iter().enumerate() {
                if e.aggregate_id != append.aggregate_id {
                    return Err(EventStoreError::InvalidAppend(format!(
                        "event {idx} targets {} inside the append for {}",
                        e.aggregate_id, append.aggregate_id
                    )));
                }
                if e.aggregate_type != append.aggregate_type {
                    return Err(EventStoreError::AggregateTypeMismatch(format!(
                        "event {idx} has aggregate_type '{}', append declares '{}'",
                        e.aggregate_type, append.aggregate_type
                    )));
                }
            }
        }
        Ok(())
    }
}

impl EventStore for InMemoryEventStore {
    fn commit(&self, appends: Vec<StreamAppend>) -> Result<Vec<StoredEvent>, EventStoreError> {
        Self::validate_batch(&appends)?;

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        // Check phase: nothing is written unless every stream passes.
        for append in &appends {
            let stream = streams.get(&append.aggregate_id);
            let current = Self::current_version(stream);

            if !append.expected_version.matches(current) {
                return Err(EventStoreError::Concurrency(format!(
                    "stream {}: expected {:?}, found {current}",
                    append.aggregate_id, append.expected_version
                )));
            }

            if let Some(existing) = stream.and_then(|s| s.first()) {
                if existing.aggregate_type != append.aggregate_type {
                    return Err(EventStoreError::AggregateTypeMismatch(format!(
                        "stream aggregate_type is '{}', attempted append with '{}'",
                        existing.aggregate_type, append.aggregate_type
                    )));
                }
            }
        }

        // Write phase.
        let mut committed = Vec::new();
        for append in appends.into_iter().filter(|a| !a.is_guard()) {
            let stream = streams.entry(append.aggregate_id).or_default();
            let mut next = Self::current_version(Some(stream)) + 1;

            for e in append.events {
                let stored = StoredEvent {
                    event_id: e.event_id,
                    aggregate_id: e.aggregate_id,
                    aggregate_type: e.aggregate_type,
                    sequence_number: next,
                    event_type: e.event_type,
                    event_version: e.event_version,
                    occurred_at: e.occurred_at,
                    payload: e.payload,
                };
                next += 1;
                stream.push(stored.clone());
                committed.push(stored);
            }
        }

        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::UncommittedEvent;
    use chrono::Utc;
    use procura_core::ExpectedVersion;
    use uuid::Uuid;

    fn event(aggregate_id: AggregateId, aggregate_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "test.happened".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({}),
        }
    }

    fn append(
        aggregate_id: AggregateId,
        expected: u64,
        count: usize,
    ) -> StreamAppend {
        StreamAppend {
            aggregate_id,
            aggregate_type: "test".to_string(),
            expected_version: ExpectedVersion::Exact(expected),
            events: (0..count).map(|_| event(aggregate_id, "test")).collect(),
        }
    }

    #[test]
    fn sequence_numbers_are_contiguous_per_stream() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();

        store.commit(vec![append(a, 0, 2)]).unwrap();
        store.commit(vec![append(a, 2, 1)]).unwrap();

        let seq: Vec<u64> = store
            .load_stream(a)
            .unwrap()
            .iter()
            .map(|e| e.sequence_number)
            .collect();
        assert_eq!(seq, vec![1, 2, 3]);
    }

    #[test]
    fn one_stale_stream_aborts_the_whole_commit() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();
        store.commit(vec![append(b, 0, 1)]).unwrap();

        let err = store
            .commit(vec![append(a, 0, 1), append(b, 0, 1)])
            .unwrap_err();

        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert!(store.load_stream(a).unwrap().is_empty());
        assert_eq!(store.load_stream(b).unwrap().len(), 1);
    }

    #[test]
    fn guard_checks_version_without_writing() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let guarded = AggregateId::new();
        store.commit(vec![append(guarded, 0, 1)]).unwrap();

        store
            .commit(vec![
                append(a, 0, 1),
                StreamAppend::guard(guarded, "test", ExpectedVersion::Exact(1)),
            ])
            .unwrap();
        assert_eq!(store.load_stream(guarded).unwrap().len(), 1);

        let err = store
            .commit(vec![
                append(a, 1, 1),
                StreamAppend::guard(guarded, "test", ExpectedVersion::Exact(0)),
            ])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream(a).unwrap().len(), 1);
    }

    #[test]
    fn aggregate_type_is_stable() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        store.commit(vec![append(a, 0, 1)]).unwrap();

        let err = store
            .append(vec![event(a, "other")], ExpectedVersion::Exact(1))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[test]
    fn duplicate_stream_in_one_commit_is_rejected() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let err = store
            .commit(vec![append(a, 0, 1), append(a, 0, 1)])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
    }
}
