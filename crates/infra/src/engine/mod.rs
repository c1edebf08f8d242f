//! The procurement engine.
//!
//! [`Procurement`] exposes every component operation (requisitions, bids,
//! ranking, award, order lifecycle, receipts, invoices, ratings, inventory).
//! Each operation:
//!
//! 1. checks the caller's capability once,
//! 2. loads the aggregates it reads,
//! 3. decides all resulting events in one [`UnitOfWork`](crate::UnitOfWork),
//! 4. commits them atomically,
//! 5. fires best-effort notifications/reports after the commit.
//!
//! Entities owned by someone else are reported as `NotFound`.

mod award;
mod bids;
mod fulfillment;
mod inventory;
mod orders;
mod ranking;
mod requisitions;
mod vendors;

pub use award::{AwardOutcome, Decision};

use std::sync::Arc;

use serde_json::Value as JsonValue;

use procura_auth::Principal;
use procura_core::UserId;
use procura_events::{EventBus, EventEnvelope};
use procura_fulfillment::{Invoice, InvoiceId, Receipt, ReceiptId};
use procura_inventory::{InventoryItem, InventoryItemId};
use procura_parties::{Vendor, VendorId};
use procura_purchasing::{Bid, BidId, Order, OrderId, Requisition, RequisitionId};

use crate::config::SideEffectsConfig;
use crate::error::DispatchError;
use crate::event_store::EventStore;
use crate::side_effects::{Notification, Notifier, ReportRenderer, ReportRequest};
use crate::unit_of_work::{Loaded, Repository};

/// Stream type names recorded in the event store.
pub mod stream {
    pub const ITEM: &str = "inventory.item";
    pub const VENDOR: &str = "parties.vendor";
    pub const REQUISITION: &str = "purchasing.requisition";
    pub const BID: &str = "purchasing.bid";
    pub const ORDER: &str = "purchasing.order";
    pub const RECEIPT: &str = "fulfillment.receipt";
    pub const INVOICE: &str = "fulfillment.invoice";
}

pub struct Procurement<S, B> {
    repository: Repository<S, B>,
    notifier: Arc<dyn Notifier>,
    reports: Arc<dyn ReportRenderer>,
    side_effects: SideEffectsConfig,
}

impl<S, B> Procurement<S, B> {
    pub fn new(
        store: S,
        bus: B,
        notifier: Arc<dyn Notifier>,
        reports: Arc<dyn ReportRenderer>,
    ) -> Self {
        Self {
            repository: Repository::new(store, bus),
            notifier,
            reports,
            side_effects: SideEffectsConfig::default(),
        }
    }

    pub fn with_side_effects(mut self, side_effects: SideEffectsConfig) -> Self {
        self.side_effects = side_effects;
        self
    }

    pub fn repository(&self) -> &Repository<S, B> {
        &self.repository
    }
}

impl<S, B> Procurement<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn notify(&self, notification: Notification) {
        if !self.side_effects.notifications_enabled {
            tracing::debug!(kind = notification.kind.as_str(), "notifications disabled; skipped");
            return;
        }
        let kind = notification.kind;
        if let Err(e) = self.notifier.send(notification) {
            tracing::warn!(kind = kind.as_str(), error = %e, "notification failed");
        }
    }

    fn render_report(&self, request: ReportRequest) {
        if !self.side_effects.reports_enabled {
            tracing::debug!(kind = request.kind.as_str(), "reports disabled; skipped");
            return;
        }
        let (kind, entity_id) = (request.kind, request.entity_id);
        match self.reports.render(request) {
            Ok(report) => tracing::debug!(filename = %report.filename, "report rendered"),
            Err(e) => tracing::warn!(
                kind = kind.as_str(),
                %entity_id,
                error = %e,
                "report rendering failed"
            ),
        }
    }

    // Loaders return the possibly-empty aggregate; `existing_*` turn an
    // absent entity into NotFound.

    fn load_item(&self, id: InventoryItemId) -> Result<Loaded<InventoryItem>, DispatchError> {
        self.repository
            .load(id.aggregate_id(), stream::ITEM, || InventoryItem::empty(id))
    }

    fn load_vendor(&self, id: VendorId) -> Result<Loaded<Vendor>, DispatchError> {
        self.repository
            .load(id.aggregate_id(), stream::VENDOR, || Vendor::empty(id))
    }

    fn load_requisition(&self, id: RequisitionId) -> Result<Loaded<Requisition>, DispatchError> {
        self.repository
            .load(id.aggregate_id(), stream::REQUISITION, || Requisition::empty(id))
    }

    fn load_bid(&self, id: BidId) -> Result<Loaded<Bid>, DispatchError> {
        self.repository
            .load(id.aggregate_id(), stream::BID, || Bid::empty(id))
    }

    fn load_order(&self, id: OrderId) -> Result<Loaded<Order>, DispatchError> {
        self.repository
            .load(id.aggregate_id(), stream::ORDER, || Order::empty(id))
    }

    fn load_receipt(&self, id: ReceiptId) -> Result<Loaded<Receipt>, DispatchError> {
        self.repository
            .load(id.aggregate_id(), stream::RECEIPT, || Receipt::empty(id))
    }

    fn load_invoice(&self, id: InvoiceId) -> Result<Loaded<Invoice>, DispatchError> {
        self.repository
            .load(id.aggregate_id(), stream::INVOICE, || Invoice::empty(id))
    }

    fn existing_item(&self, id: InventoryItemId) -> Result<Loaded<InventoryItem>, DispatchError> {
        let item = self.load_item(id)?;
        present(item.exists(), item)
    }

    fn existing_vendor(&self, id: VendorId) -> Result<Loaded<Vendor>, DispatchError> {
        let vendor = self.load_vendor(id)?;
        present(vendor.exists(), vendor)
    }

    fn existing_requisition(
        &self,
        id: RequisitionId,
    ) -> Result<Loaded<Requisition>, DispatchError> {
        let requisition = self.load_requisition(id)?;
        present(requisition.exists(), requisition)
    }

    fn existing_bid(&self, id: BidId) -> Result<Loaded<Bid>, DispatchError> {
        let bid = self.load_bid(id)?;
        present(bid.exists(), bid)
    }

    fn existing_order(&self, id: OrderId) -> Result<Loaded<Order>, DispatchError> {
        let order = self.load_order(id)?;
        present(order.exists(), order)
    }

    fn existing_receipt(&self, id: ReceiptId) -> Result<Loaded<Receipt>, DispatchError> {
        let receipt = self.load_receipt(id)?;
        present(receipt.exists(), receipt)
    }

    fn existing_invoice(&self, id: InvoiceId) -> Result<Loaded<Invoice>, DispatchError> {
        let invoice = self.load_invoice(id)?;
        present(invoice.exists(), invoice)
    }

    /// A requisition owned by `caller`.
    fn owned_requisition(
        &self,
        caller: &Principal,
        id: RequisitionId,
    ) -> Result<Loaded<Requisition>, DispatchError> {
        let requisition = self.existing_requisition(id)?;
        ensure_owner(requisition.owner(), caller)?;
        Ok(requisition)
    }

    /// A bid placed by `caller`'s vendor profile.
    fn own_bid(&self, caller: &Principal, id: BidId) -> Result<Loaded<Bid>, DispatchError> {
        let bid = self.existing_bid(id)?;
        if bid.vendor_id() != Some(vendor_of(caller)) {
            return Err(DispatchError::NotFound);
        }
        Ok(bid)
    }
}

fn present<T>(exists: bool, loaded: T) -> Result<T, DispatchError> {
    if exists {
        Ok(loaded)
    } else {
        Err(DispatchError::NotFound)
    }
}

/// "Not mine" is indistinguishable from "absent".
fn ensure_owner(owner: Option<UserId>, caller: &Principal) -> Result<(), DispatchError> {
    if owner == Some(caller.user_id) {
        Ok(())
    } else {
        Err(DispatchError::NotFound)
    }
}

/// Vendor profile identity of a caller acting as vendor.
fn vendor_of(caller: &Principal) -> VendorId {
    VendorId::for_user(caller.user_id)
}
