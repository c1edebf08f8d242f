//! Infrastructure layer: event store, unit of work, side-effect collaborators,
//! configuration, and the procurement engine composing them.

pub mod config;
pub mod engine;
pub mod error;
pub mod event_store;
pub mod side_effects;
pub mod unit_of_work;

pub use engine::{AwardOutcome, Decision, Procurement};
pub use error::{DispatchError, ErrorKind};
pub use unit_of_work::{Loaded, Repository, UnitOfWork};
