//! Tracing/logging setup shared by every binary and test harness.

pub mod subscriber;

pub use subscriber::{LogConfig, init};
