use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use procura_events::Event;
use procura_parties::VendorId;

use crate::bid::BidId;
use crate::requisition::RequisitionId;

procura_core::typed_aggregate_id!(
    /// Order identifier.
    OrderId
);

/// Order number for the order awarded from `requisition_number`.
pub fn order_number_for(requisition_number: &str) -> String {
    format!("PO-{requisition_number}")
}

/// Order status lifecycle: pending → shipped → delivered, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
}

impl OrderStatus {
    /// The only status this one may advance to.
    pub fn next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
        }
    }
}

/// Aggregate root: Order (created only by an award).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    order_number: String,
    bid_id: Option<BidId>,
    requisition_id: Option<RequisitionId>,
    vendor_id: Option<VendorId>,
    buyer_id: Option<UserId>,
    status: OrderStatus,
    receipt_id: Option<AggregateId>,
    invoice_id: Option<AggregateId>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            order_number: String::new(),
            bid_id: None,
            requisition_id: None,
            vendor_id: None,
            buyer_id: None,
            status: OrderStatus::Pending,
            receipt_id: None,
            invoice_id: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn bid_id(&self) -> Option<BidId> {
        self.bid_id
    }

    pub fn requisition_id(&self) -> Option<RequisitionId> {
        self.requisition_id
    }

    pub fn vendor_id(&self) -> Option<VendorId> {
        self.vendor_id
    }

    /// The procurement officer who owns the requisition.
    pub fn buyer_id(&self) -> Option<UserId> {
        self.buyer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn receipt_id(&self) -> Option<AggregateId> {
        self.receipt_id
    }

    pub fn invoice_id(&self) -> Option<AggregateId> {
        self.invoice_id
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub order_number: String,
    pub bid_id: BidId,
    pub requisition_id: RequisitionId,
    pub vendor_id: VendorId,
    pub buyer_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdvanceStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceStatus {
    pub order_id: OrderId,
    pub new_status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AttachReceipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachReceipt {
    pub order_id: OrderId,
    pub receipt_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AttachInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachInvoice {
    pub order_id: OrderId,
    pub invoice_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    AdvanceStatus(AdvanceStatus),
    AttachReceipt(AttachReceipt),
    AttachInvoice(AttachInvoice),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub order_number: String,
    pub bid_id: BidId,
    pub requisition_id: RequisitionId,
    pub vendor_id: VendorId,
    pub buyer_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderStatusAdvanced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusAdvanced {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptAttached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptAttached {
    pub order_id: OrderId,
    pub receipt_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceAttached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceAttached {
    pub order_id: OrderId,
    pub invoice_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    OrderStatusAdvanced(OrderStatusAdvanced),
    ReceiptAttached(ReceiptAttached),
    InvoiceAttached(InvoiceAttached),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "purchasing.order.placed",
            OrderEvent::OrderStatusAdvanced(_) => "purchasing.order.status_advanced",
            OrderEvent::ReceiptAttached(_) => "purchasing.order.receipt_attached",
            OrderEvent::InvoiceAttached(_) => "purchasing.order.invoice_attached",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::OrderStatusAdvanced(e) => e.occurred_at,
            OrderEvent::ReceiptAttached(e) => e.occurred_at,
            OrderEvent::InvoiceAttached(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.order_number = e.order_number.clone();
                self.bid_id = Some(e.bid_id);
                self.requisition_id = Some(e.requisition_id);
                self.vendor_id = Some(e.vendor_id);
                self.buyer_id = Some(e.buyer_id);
                self.status = OrderStatus::Pending;
                self.created = true;
            }
            OrderEvent::OrderStatusAdvanced(e) => {
                self.status = e.to;
            }
            OrderEvent::ReceiptAttached(e) => {
                self.receipt_id = Some(e.receipt_id);
            }
            OrderEvent::InvoiceAttached(e) => {
                self.invoice_id = Some(e.invoice_id);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::AdvanceStatus(cmd) => self.handle_advance(cmd),
            OrderCommand::AttachReceipt(cmd) => self.handle_attach_receipt(cmd),
            OrderCommand::AttachInvoice(cmd) => self.handle_attach_invoice(cmd),
        }
    }
}

impl Order {
    fn ensure_exists(&self, order_id: OrderId) -> Result<(), DomainError> {
        if !self.created || self.id != order_id {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_delivered(&self, record: &str) -> Result<(), DomainError> {
        if self.status != OrderStatus::Delivered {
            return Err(DomainError::conflict(format!(
                "a {record} can only be created once the order is delivered (status: {})",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            bid_id: cmd.bid_id,
            requisition_id: cmd.requisition_id,
            vendor_id: cmd.vendor_id,
            buyer_id: cmd.buyer_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_advance(&self, cmd: &AdvanceStatus) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;

        if self.status.next() != Some(cmd.new_status) {
            return Err(DomainError::conflict(format!(
                "invalid status transition: {} -> {}",
                self.status.as_str(),
                cmd.new_status.as_str()
            )));
        }

        Ok(vec![OrderEvent::OrderStatusAdvanced(OrderStatusAdvanced {
            order_id: cmd.order_id,
            from: self.status,
            to: cmd.new_status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_attach_receipt(&self, cmd: &AttachReceipt) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;
        self.ensure_delivered("receipt")?;
        if self.receipt_id.is_some() {
            return Err(DomainError::conflict("order already has a receipt"));
        }

        Ok(vec![OrderEvent::ReceiptAttached(ReceiptAttached {
            order_id: cmd.order_id,
            receipt_id: cmd.receipt_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_attach_invoice(&self, cmd: &AttachInvoice) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;
        self.ensure_delivered("invoice")?;
        if self.invoice_id.is_some() {
            return Err(DomainError::conflict("order already has an invoice"));
        }

        Ok(vec![OrderEvent::InvoiceAttached(InvoiceAttached {
            order_id: cmd.order_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_events::execute;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn placed_order() -> Order {
        let order_id = OrderId::generate();
        let mut order = Order::empty(order_id);
        execute(
            &mut order,
            &OrderCommand::PlaceOrder(PlaceOrder {
                order_id,
                order_number: order_number_for("REQ-7"),
                bid_id: BidId::generate(),
                requisition_id: RequisitionId::generate(),
                vendor_id: VendorId::for_user(UserId::new()),
                buyer_id: UserId::new(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        order
    }

    fn advance(order: &mut Order, new_status: OrderStatus) -> Result<Vec<OrderEvent>, DomainError> {
        let order_id = order.id_typed();
        execute(
            order,
            &OrderCommand::AdvanceStatus(AdvanceStatus {
                order_id,
                new_status,
                occurred_at: test_time(),
            }),
        )
    }

    fn attach_receipt(order: &mut Order) -> Result<Vec<OrderEvent>, DomainError> {
        let order_id = order.id_typed();
        execute(
            order,
            &OrderCommand::AttachReceipt(AttachReceipt {
                order_id,
                receipt_id: AggregateId::new(),
                occurred_at: test_time(),
            }),
        )
    }

    #[test]
    fn order_number_is_derived_from_requisition_number() {
        let order = placed_order();
        assert_eq!(order.order_number(), "PO-REQ-7");
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn forward_transitions_succeed() {
        let mut order = placed_order();
        advance(&mut order, OrderStatus::Shipped).unwrap();
        advance(&mut order, OrderStatus::Delivered).unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn skipped_repeated_and_backward_transitions_are_conflicts() {
        let mut order = placed_order();
        assert!(matches!(advance(&mut order, OrderStatus::Delivered), Err(DomainError::Conflict(_))));
        assert!(matches!(advance(&mut order, OrderStatus::Pending), Err(DomainError::Conflict(_))));

        advance(&mut order, OrderStatus::Shipped).unwrap();
        assert!(matches!(advance(&mut order, OrderStatus::Shipped), Err(DomainError::Conflict(_))));
        assert!(matches!(advance(&mut order, OrderStatus::Pending), Err(DomainError::Conflict(_))));

        advance(&mut order, OrderStatus::Delivered).unwrap();
        for status in [OrderStatus::Pending, OrderStatus::Shipped, OrderStatus::Delivered] {
            assert!(matches!(advance(&mut order, status), Err(DomainError::Conflict(_))));
        }
    }

    #[test]
    fn receipt_requires_delivery_and_is_created_once() {
        let mut order = placed_order();
        advance(&mut order, OrderStatus::Shipped).unwrap();
        assert!(matches!(attach_receipt(&mut order), Err(DomainError::Conflict(_))));
        assert_eq!(order.receipt_id(), None);

        advance(&mut order, OrderStatus::Delivered).unwrap();
        attach_receipt(&mut order).unwrap();
        assert!(order.receipt_id().is_some());
        assert!(matches!(attach_receipt(&mut order), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn placing_twice_is_a_conflict() {
        let order = placed_order();
        let err = order
            .handle(&OrderCommand::PlaceOrder(PlaceOrder {
                order_id: order.id_typed(),
                order_number: "PO-X".to_string(),
                bid_id: BidId::generate(),
                requisition_id: RequisitionId::generate(),
                vendor_id: VendorId::for_user(UserId::new()),
                buyer_id: UserId::new(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
