//! `procura-auth`: capability checks consulted once per engine operation.
//!
//! Decoupled from HTTP, sessions and storage: the surrounding layer resolves a
//! [`Principal`] and the engine asks it what it may act as.

pub mod authorize;
pub mod capability;
pub mod roles;

pub use authorize::{AuthzError, Principal, authorize};
pub use capability::Capability;
pub use roles::Role;
