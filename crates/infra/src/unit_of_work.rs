//! Multi-aggregate command execution.
//!
//! ```text
//! load streams ─► rehydrate ─► decide (handle + apply, per aggregate)
//!                                   │
//!                                   ▼
//!                  commit every touched stream at its loaded version
//!                                   │
//!                                   ▼
//!                        publish committed envelopes
//! ```
//!
//! A procurement operation usually touches more than one aggregate (an award
//! writes the requisition, every bid and a new order). All events decided
//! within one [`UnitOfWork`] are committed in a single [`EventStore::commit`],
//! so the operation either lands completely or not at all. Each stream is
//! checked at the version it had when loaded: if anything else wrote it in
//! between, the commit fails with `Conflict` and nothing is written.

use std::ops::Deref;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use procura_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use procura_events::{EventBus, EventEnvelope};

use crate::error::DispatchError;
use crate::event_store::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};

/// A rehydrated aggregate plus the stream version it was loaded at.
#[derive(Debug, Clone)]
pub struct Loaded<A> {
    aggregate_id: AggregateId,
    aggregate_type: &'static str,
    aggregate: A,
    loaded_version: u64,
}

impl<A> Loaded<A> {
    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &'static str {
        self.aggregate_type
    }

    /// Stream version at load time (0 for a stream with no events).
    pub fn loaded_version(&self) -> u64 {
        self.loaded_version
    }

    pub fn into_inner(self) -> A {
        self.aggregate
    }
}

impl<A> Deref for Loaded<A> {
    type Target = A;

    fn deref(&self) -> &A {
        &self.aggregate
    }
}

/// Events decided during one operation, grouped per stream.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    appends: Vec<StreamAppend>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `command` against the loaded aggregate and stage the resulting events.
    ///
    /// The events are applied in place, so later decisions in the same unit
    /// see the updated state.
    pub fn decide<A>(
        &mut self,
        loaded: &mut Loaded<A>,
        command: &A::Command,
    ) -> Result<Vec<A::Event>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: procura_events::Event + Serialize,
    {
        let decided = loaded.aggregate.handle(command)?;

        let mut staged = Vec::with_capacity(decided.len());
        for ev in &decided {
            staged.push(UncommittedEvent::from_typed(
                loaded.aggregate_id,
                loaded.aggregate_type,
                Uuid::now_v7(),
                ev,
            )?);
            loaded.aggregate.apply(ev);
        }

        self.stream_for(loaded).events.extend(staged);
        Ok(decided)
    }

    /// Require `loaded`'s stream to still be at its loaded version at commit.
    pub fn guard<A>(&mut self, loaded: &Loaded<A>) {
        self.stream_for(loaded);
    }

    /// Number of events staged across every stream.
    pub fn staged_events(&self) -> usize {
        self.appends.iter().map(|a| a.events.len()).sum()
    }

    fn stream_for<A>(&mut self, loaded: &Loaded<A>) -> &mut StreamAppend {
        let idx = match self
            .appends
            .iter()
            .position(|a| a.aggregate_id == loaded.aggregate_id)
        {
            Some(idx) => idx,
            None => {
                self.appends.push(StreamAppend::guard(
                    loaded.aggregate_id,
                    loaded.aggregate_type,
                    ExpectedVersion::Exact(loaded.loaded_version),
                ));
                self.appends.len() - 1
            }
        };
        &mut self.appends[idx]
    }
}

/// Loads aggregates from the store and commits units of work.
#[derive(Debug)]
pub struct Repository<S, B> {
    store: S,
    bus: B,
}

impl<S, B> Repository<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> Repository<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Rehydrate an aggregate from its stream.
    ///
    /// An empty stream yields the factory's empty aggregate (callers decide
    /// whether that means NotFound or a creation target). A stream recorded
    /// under another aggregate type is reported as NotFound.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &'static str,
        make_aggregate: impl FnOnce() -> A,
    ) -> Result<Loaded<A>, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, aggregate_type, &history)?;

        let mut aggregate = make_aggregate();
        apply_history(&mut aggregate, &history)?;

        Ok(Loaded {
            aggregate_id,
            aggregate_type,
            aggregate,
            loaded_version: history.last().map(|e| e.sequence_number).unwrap_or(0),
        })
    }

    /// Commit every staged stream atomically, then publish the committed events.
    ///
    /// Publication happens after the commit and its failure is only logged.
    pub fn commit(&self, uow: UnitOfWork) -> Result<Vec<StoredEvent>, DispatchError> {
        if uow.staged_events() == 0 {
            return Ok(vec![]);
        }

        let committed = self.store.commit(uow.appends)?;

        for stored in &committed {
            if let Err(e) = self.bus.publish(stored.to_envelope()) {
                tracing::warn!(
                    event_id = %stored.event_id,
                    event_type = %stored.event_type,
                    error = ?e,
                    "event publication failed after commit"
                );
            }
        }

        Ok(committed)
    }
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    aggregate_type: &str,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.aggregate_type != aggregate_type {
            tracing::debug!(
                %aggregate_id,
                expected = aggregate_type,
                found = %e.aggregate_type,
                "stream belongs to another aggregate type"
            );
            return Err(DispatchError::NotFound);
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use procura_core::{AggregateRoot, Money, UserId};
    use procura_events::InMemoryEventBus;
    use procura_inventory::{
        AdjustStock, CreateItem, InventoryCommand, InventoryItem, InventoryItemId, ItemDetails,
    };
    use rust_decimal::Decimal;

    use crate::event_store::InMemoryEventStore;

    type TestRepository =
        Repository<InMemoryEventStore, InMemoryEventBus<EventEnvelope<JsonValue>>>;

    const ITEM: &str = "inventory.item";

    fn repository() -> TestRepository {
        Repository::new(InMemoryEventStore::new(), InMemoryEventBus::new())
    }

    fn load_item(repo: &TestRepository, id: InventoryItemId) -> Loaded<InventoryItem> {
        repo.load(id.aggregate_id(), ITEM, || InventoryItem::empty(id))
            .unwrap()
    }

    fn create(id: InventoryItemId) -> InventoryCommand {
        InventoryCommand::CreateItem(CreateItem {
            item_id: id,
            owner: UserId::new(),
            details: ItemDetails {
                name: "Widget".to_string(),
                description: "steel widget".to_string(),
                unit_price: Money::new(Decimal::new(250, 2)).unwrap(),
                reorder_level: 10,
                location: "A-1".to_string(),
                expiration_date: None,
            },
            initial_stock: 5,
            occurred_at: Utc::now(),
        })
    }

    fn adjust(id: InventoryItemId, delta: i64) -> InventoryCommand {
        InventoryCommand::AdjustStock(AdjustStock {
            item_id: id,
            delta,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn decisions_on_one_stream_merge_and_publish() {
        let repo = repository();
        let sub = repo.bus().subscribe();
        let id = InventoryItemId::generate();

        let mut item = load_item(&repo, id);
        let mut uow = UnitOfWork::new();
        uow.decide(&mut item, &create(id)).unwrap();
        uow.decide(&mut item, &adjust(id, 3)).unwrap();
        assert_eq!(item.stock(), 8);

        let committed = repo.commit(uow).unwrap();
        assert_eq!(committed.len(), 2);
        assert_eq!(sub.drain().len(), 2);

        let reloaded = load_item(&repo, id);
        assert_eq!(reloaded.loaded_version(), 2);
        assert_eq!(reloaded.version(), 2);
        assert_eq!(reloaded.stock(), 8);
    }

    #[test]
    fn stale_load_fails_with_conflict() {
        let repo = repository();
        let id = InventoryItemId::generate();

        let mut item = load_item(&repo, id);
        let mut uow = UnitOfWork::new();
        uow.decide(&mut item, &create(id)).unwrap();
        repo.commit(uow).unwrap();

        let mut first = load_item(&repo, id);
        let mut second = load_item(&repo, id);

        let mut uow = UnitOfWork::new();
        uow.decide(&mut first, &adjust(id, 1)).unwrap();
        repo.commit(uow).unwrap();

        let mut uow = UnitOfWork::new();
        uow.decide(&mut second, &adjust(id, 1)).unwrap();
        let err = repo.commit(uow).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Conflict);

        assert_eq!(load_item(&repo, id).stock(), 6);
    }

    #[test]
    fn rejected_decision_stages_nothing() {
        let repo = repository();
        let id = InventoryItemId::generate();

        let mut item = load_item(&repo, id);
        let mut uow = UnitOfWork::new();
        let err = uow.decide(&mut item, &adjust(id, 1)).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));
        assert_eq!(uow.staged_events(), 0);
        assert!(repo.commit(uow).unwrap().is_empty());
    }

    #[test]
    fn stream_of_another_type_is_not_found() {
        let repo = repository();
        let id = InventoryItemId::generate();

        let mut item = load_item(&repo, id);
        let mut uow = UnitOfWork::new();
        uow.decide(&mut item, &create(id)).unwrap();
        repo.commit(uow).unwrap();

        let err = repo
            .load(id.aggregate_id(), "purchasing.order", || InventoryItem::empty(id))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));
    }
}
