use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use procura_core::UserId;
use procura_events::EventBus;

use super::SideEffectError;

/// Template selector for an outgoing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    BidSubmitted,
    BidUpdated,
    BidAccepted,
    BidRejected,
    RequisitionApproved,
    OrderCreated,
    OrderStatusChanged,
    ReceiptCreated,
    ReceiptUpdated,
    InvoiceCreated,
    InvoiceUpdated,
    InvoicePaid,
    InvoiceVendorRated,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::BidSubmitted => "bid-submitted",
            NotificationKind::BidUpdated => "bid-updated",
            NotificationKind::BidAccepted => "bid-accepted",
            NotificationKind::BidRejected => "bid-rejected",
            NotificationKind::RequisitionApproved => "requisition-approved",
            NotificationKind::OrderCreated => "order-created",
            NotificationKind::OrderStatusChanged => "order-status-changed",
            NotificationKind::ReceiptCreated => "receipt-created",
            NotificationKind::ReceiptUpdated => "receipt-updated",
            NotificationKind::InvoiceCreated => "invoice-created",
            NotificationKind::InvoiceUpdated => "invoice-updated",
            NotificationKind::InvoicePaid => "invoice-paid",
            NotificationKind::InvoiceVendorRated => "invoice-vendor-rated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipients: Vec<UserId>,
    pub kind: NotificationKind,
    /// Template variables.
    pub context: JsonValue,
}

impl Notification {
    pub fn new(
        recipients: impl IntoIterator<Item = UserId>,
        kind: NotificationKind,
        context: JsonValue,
    ) -> Self {
        Self {
            recipients: recipients.into_iter().collect(),
            kind,
            context,
        }
    }
}

/// Fire-and-forget delivery of notifications.
pub trait Notifier: Send + Sync {
    fn send(&self, notification: Notification) -> Result<(), SideEffectError>;
}

/// Hands notifications to a bus for an out-of-process mail worker.
#[derive(Debug)]
pub struct BusNotifier<B> {
    bus: B,
}

impl<B> BusNotifier<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B> Notifier for BusNotifier<B>
where
    B: EventBus<Notification>,
{
    fn send(&self, notification: Notification) -> Result<(), SideEffectError> {
        self.bus
            .publish(notification)
            .map_err(|e| SideEffectError::Delivery(format!("{e:?}")))
    }
}

/// Logs notifications instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn send(&self, notification: Notification) -> Result<(), SideEffectError> {
        tracing::info!(
            kind = notification.kind.as_str(),
            recipients = notification.recipients.len(),
            context = %notification.context,
            "notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_events::InMemoryEventBus;
    use std::sync::Arc;

    #[test]
    fn kinds_serialize_as_template_names() {
        assert_eq!(
            serde_json::to_value(NotificationKind::InvoiceVendorRated).unwrap(),
            serde_json::json!("invoice-vendor-rated")
        );
        assert_eq!(NotificationKind::OrderStatusChanged.as_str(), "order-status-changed");
    }

    #[test]
    fn bus_notifier_publishes_to_subscribers() {
        let bus = Arc::new(InMemoryEventBus::new());
        let worker = bus.subscribe();
        let notifier = BusNotifier::new(bus.clone());
        let vendor = UserId::new();

        notifier
            .send(Notification::new(
                [vendor],
                NotificationKind::BidAccepted,
                serde_json::json!({ "order_number": "PO-REQ-1" }),
            ))
            .unwrap();

        let received = worker.drain();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].recipients, vec![vendor]);
        assert_eq!(received[0].kind, NotificationKind::BidAccepted);
    }
}
