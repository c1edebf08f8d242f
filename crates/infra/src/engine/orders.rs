//! Order status, driven by the fulfilling vendor.

use chrono::Utc;
use serde_json::{Value as JsonValue, json};

use procura_auth::{Capability, Principal, authorize};
use procura_events::{EventBus, EventEnvelope};
use procura_purchasing::{AdvanceStatus, Order, OrderCommand, OrderId, OrderStatus};

use super::{Procurement, vendor_of};
use crate::error::DispatchError;
use crate::event_store::EventStore;
use crate::side_effects::{Notification, NotificationKind};
use crate::unit_of_work::UnitOfWork;

impl<S, B> Procurement<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Move an order one stage forward (pending → shipped → delivered).
    #[tracing::instrument(skip_all, fields(%order_id, to = new_status.as_str()), err(level = "debug"))]
    pub fn advance_order(
        &self,
        caller: &Principal,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<OrderStatus, DispatchError> {
        authorize(caller, Capability::ActAsVendor)?;

        let mut order = self.existing_order(order_id)?;
        if order.vendor_id() != Some(vendor_of(caller)) {
            return Err(DispatchError::NotFound);
        }
        let from = order.status();

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut order,
            &OrderCommand::AdvanceStatus(AdvanceStatus {
                order_id,
                new_status,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!(from = from.as_str(), "order status advanced");

        self.notify(Notification::new(
            order.buyer_id(),
            NotificationKind::OrderStatusChanged,
            json!({
                "order_number": order.order_number(),
                "from": from.as_str(),
                "to": new_status.as_str(),
            }),
        ));

        Ok(order.status())
    }

    /// Visible to the buyer and the fulfilling vendor.
    pub fn order(&self, caller: &Principal, order_id: OrderId) -> Result<Order, DispatchError> {
        let order = self.existing_order(order_id)?;
        if order.buyer_id() != Some(caller.user_id)
            && order.vendor_id() != Some(vendor_of(caller))
        {
            return Err(DispatchError::NotFound);
        }
        Ok(order.into_inner())
    }
}
