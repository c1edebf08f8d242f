//! Best-effort collaborators invoked after a transition commits.
//!
//! Failures here are logged by the engine and never alter an operation's
//! outcome.

pub mod notifier;
pub mod report;

use thiserror::Error;

pub use notifier::{BusNotifier, Notification, NotificationKind, Notifier, TracingNotifier};
pub use report::{
    PlainTextReportRenderer, RenderedReport, ReportKind, ReportRenderer, ReportRequest,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SideEffectError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),

    #[error("report rendering failed: {0}")]
    Render(String),
}
