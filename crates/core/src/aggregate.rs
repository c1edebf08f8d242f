//! Aggregate traits shared by every procurement entity.
//!
//! Items, vendors, requisitions, bids, orders, receipts and invoices are each
//! rebuilt from their own event stream and decide new events from commands.

use crate::error::{DomainError, DomainResult};

/// An entity with its own stream: a typed id and the number of events replayed into it.
pub trait AggregateRoot {
    /// Typed id such as `BidId`; its `AggregateId` names the stream.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Events applied so far; equals the stream version the entity was loaded at
    /// until new decisions are applied on top.
    fn version(&self) -> u64;
}

/// Stream version a commit is conditioned on.
///
/// Awards commit the requisition stream at `Exact(loaded)`, which is what lets
/// only one of two racing accepts through.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Append regardless of the current version.
    Any,
    /// The stream must still be at this version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Command handling for a procurement entity.
///
/// `handle` checks the lifecycle rules (a bid decided once, an order advanced
/// one stage, an invoice rated once) against current state and returns the
/// resulting events without mutating. `apply` folds one event into state and
/// is also what replay uses, so it never fails. No IO in either.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Fold one event into state and bump the version by one.
    fn apply(&mut self, event: &Self::Event);

    /// Validate `command` and return the events it produces; an empty vec means no-op.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_version_mismatch_is_a_conflict() {
        assert!(ExpectedVersion::Exact(3).check(3).is_ok());
        assert!(ExpectedVersion::Any.check(42).is_ok());
        match ExpectedVersion::Exact(2).check(3) {
            Err(DomainError::Conflict(msg)) => assert!(msg.contains("actual: 3")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
