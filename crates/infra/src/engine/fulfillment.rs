//! Receipts and invoices against delivered orders, payment and vendor rating.
//!
//! Creating either record also attaches it to the order stream in the same
//! commit; the order enforces "delivered first" and "at most one of each".

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use procura_auth::{Capability, Principal, authorize};
use procura_core::UserId;
use procura_events::{EventBus, EventEnvelope};
use procura_fulfillment::{
    AmendInvoice, AmendReceipt, FileReceipt, Invoice, InvoiceCommand, InvoiceDetails, InvoiceId,
    IssueInvoice, MarkPaid, RateVendor, Receipt, ReceiptCommand, ReceiptDetails, ReceiptId,
};
use procura_parties::{RecordRating, VendorCommand, VendorId, VendorRatingState};
use procura_purchasing::{AttachInvoice, AttachReceipt, OrderCommand, OrderId};

use super::{Procurement, ensure_owner, vendor_of};
use crate::error::DispatchError;
use crate::event_store::EventStore;
use crate::side_effects::{Notification, NotificationKind, ReportKind, ReportRequest};
use crate::unit_of_work::{Loaded, UnitOfWork};

impl<S, B> Procurement<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// File the receipt for a delivered order the caller bought.
    #[tracing::instrument(skip_all, fields(%order_id), err(level = "debug"))]
    pub fn create_receipt(
        &self,
        caller: &Principal,
        order_id: OrderId,
        details: ReceiptDetails,
    ) -> Result<ReceiptId, DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;

        let mut order = self.existing_order(order_id)?;
        ensure_owner(order.buyer_id(), caller)?;
        let vendor_id = order.vendor_id().ok_or(DispatchError::NotFound)?;

        let receipt_id = ReceiptId::generate();
        let mut receipt = self.load_receipt(receipt_id)?;
        let now = Utc::now();

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut order,
            &OrderCommand::AttachReceipt(AttachReceipt {
                order_id,
                receipt_id: receipt_id.aggregate_id(),
                occurred_at: now,
            }),
        )?;
        uow.decide(
            &mut receipt,
            &ReceiptCommand::FileReceipt(FileReceipt {
                receipt_id,
                order_id,
                buyer_id: caller.user_id,
                vendor_id,
                details,
                occurred_at: now,
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!(%receipt_id, "receipt filed");
        self.receipt_side_effects(&receipt, NotificationKind::ReceiptCreated);
        Ok(receipt_id)
    }

    #[tracing::instrument(skip_all, fields(%receipt_id), err(level = "debug"))]
    pub fn amend_receipt(
        &self,
        caller: &Principal,
        receipt_id: ReceiptId,
        details: ReceiptDetails,
    ) -> Result<(), DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;

        let mut receipt = self.existing_receipt(receipt_id)?;
        ensure_owner(receipt.buyer_id(), caller)?;

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut receipt,
            &ReceiptCommand::AmendReceipt(AmendReceipt {
                receipt_id,
                details,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!("receipt amended");
        self.receipt_side_effects(&receipt, NotificationKind::ReceiptUpdated);
        Ok(())
    }

    /// Issue the invoice for a delivered order the caller fulfilled.
    #[tracing::instrument(skip_all, fields(%order_id), err(level = "debug"))]
    pub fn create_invoice(
        &self,
        caller: &Principal,
        order_id: OrderId,
        details: InvoiceDetails,
    ) -> Result<InvoiceId, DispatchError> {
        authorize(caller, Capability::ActAsVendor)?;

        let vendor_id = vendor_of(caller);
        let mut order = self.existing_order(order_id)?;
        if order.vendor_id() != Some(vendor_id) {
            return Err(DispatchError::NotFound);
        }
        let buyer_id = order.buyer_id().ok_or(DispatchError::NotFound)?;

        let invoice_id = InvoiceId::generate();
        let mut invoice = self.load_invoice(invoice_id)?;
        let now = Utc::now();

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut order,
            &OrderCommand::AttachInvoice(AttachInvoice {
                order_id,
                invoice_id: invoice_id.aggregate_id(),
                occurred_at: now,
            }),
        )?;
        uow.decide(
            &mut invoice,
            &InvoiceCommand::IssueInvoice(IssueInvoice {
                invoice_id,
                order_id,
                buyer_id,
                vendor_id,
                details,
                occurred_at: now,
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!(%invoice_id, "invoice issued");
        self.invoice_side_effects(&invoice, NotificationKind::InvoiceCreated, true);
        Ok(invoice_id)
    }

    /// Amend an unpaid invoice the caller issued.
    #[tracing::instrument(skip_all, fields(%invoice_id), err(level = "debug"))]
    pub fn amend_invoice(
        &self,
        caller: &Principal,
        invoice_id: InvoiceId,
        details: InvoiceDetails,
    ) -> Result<(), DispatchError> {
        authorize(caller, Capability::ActAsVendor)?;

        let mut invoice = self.existing_invoice(invoice_id)?;
        if invoice.vendor_id() != Some(vendor_of(caller)) {
            return Err(DispatchError::NotFound);
        }

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut invoice,
            &InvoiceCommand::AmendInvoice(AmendInvoice {
                invoice_id,
                details,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!("invoice amended");
        self.invoice_side_effects(&invoice, NotificationKind::InvoiceUpdated, true);
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(%invoice_id), err(level = "debug"))]
    pub fn mark_invoice_paid(
        &self,
        caller: &Principal,
        invoice_id: InvoiceId,
    ) -> Result<(), DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;
        let mut invoice = self.bought_invoice(caller, invoice_id)?;

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut invoice,
            &InvoiceCommand::MarkPaid(MarkPaid {
                invoice_id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!("invoice paid");
        self.invoice_side_effects(&invoice, NotificationKind::InvoicePaid, false);
        Ok(())
    }

    /// Rate the vendor of a paid invoice, once.
    ///
    /// The invoice's `vendor_rated` flag and the vendor's running mean are
    /// written in the same commit. Returns the vendor's new rating state.
    #[tracing::instrument(skip_all, fields(%invoice_id, rating = rating), err(level = "debug"))]
    pub fn rate_vendor(
        &self,
        caller: &Principal,
        invoice_id: InvoiceId,
        rating: f64,
    ) -> Result<VendorRatingState, DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;
        let mut invoice = self.bought_invoice(caller, invoice_id)?;
        let vendor_id = invoice.vendor_id().ok_or(DispatchError::NotFound)?;
        let mut vendor = self.existing_vendor(vendor_id)?;
        let now = Utc::now();

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut invoice,
            &InvoiceCommand::RateVendor(RateVendor {
                invoice_id,
                rating,
                occurred_at: now,
            }),
        )?;
        uow.decide(
            &mut vendor,
            &VendorCommand::RecordRating(RecordRating {
                vendor_id,
                invoice_id: invoice_id.aggregate_id(),
                rating,
                occurred_at: now,
            }),
        )?;
        self.repository.commit(uow)?;

        let state = vendor.rating();
        tracing::info!(
            %vendor_id,
            mean = state.rating,
            total_ratings = state.total_ratings,
            "vendor rated"
        );
        self.invoice_side_effects(&invoice, NotificationKind::InvoiceVendorRated, false);
        Ok(state)
    }

    /// Visible to the buyer and the vendor.
    pub fn receipt(&self, caller: &Principal, receipt_id: ReceiptId) -> Result<Receipt, DispatchError> {
        let receipt = self.existing_receipt(receipt_id)?;
        ensure_party(caller, receipt.buyer_id(), receipt.vendor_id())?;
        Ok(receipt.into_inner())
    }

    /// Visible to the buyer and the vendor.
    pub fn invoice(&self, caller: &Principal, invoice_id: InvoiceId) -> Result<Invoice, DispatchError> {
        let invoice = self.existing_invoice(invoice_id)?;
        ensure_party(caller, invoice.buyer_id(), invoice.vendor_id())?;
        Ok(invoice.into_inner())
    }

    fn bought_invoice(
        &self,
        caller: &Principal,
        invoice_id: InvoiceId,
    ) -> Result<Loaded<Invoice>, DispatchError> {
        let invoice = self.existing_invoice(invoice_id)?;
        ensure_owner(invoice.buyer_id(), caller)?;
        Ok(invoice)
    }

    fn receipt_side_effects(&self, receipt: &Receipt, kind: NotificationKind) {
        let Some(details) = receipt.details() else {
            return;
        };
        let receipt_id = receipt.id_typed();

        let mut request = ReportRequest::new(
            ReportKind::InventoryReceipt,
            receipt_id.aggregate_id(),
            format!("Inventory Receipt Report - {}", details.receipt_number),
        )
        .field("Received Quantity", details.received_quantity)
        .field(
            "Received Condition",
            details.condition.map(|c| label(&c)).unwrap_or_default(),
        )
        .field(
            "Inspection Notes",
            details.inspection_notes.clone().unwrap_or_default(),
        );
        if let Some(date) = receipt.receipt_date() {
            request = request.field("Receipt Date", date);
        }
        self.render_report(request);

        self.notify(Notification::new(
            parties(receipt.buyer_id(), receipt.vendor_id()),
            kind,
            json!({
                "receipt_id": receipt_id,
                "receipt_number": details.receipt_number,
            }),
        ));
    }

    fn invoice_side_effects(&self, invoice: &Invoice, kind: NotificationKind, render: bool) {
        let Some(details) = invoice.details() else {
            return;
        };
        let invoice_id = invoice.id_typed();

        if render {
            let mut request = ReportRequest::new(
                ReportKind::Invoice,
                invoice_id.aggregate_id(),
                format!("Invoice Report - {}", details.invoice_number),
            );
            if let Some(date) = invoice.invoice_date() {
                request = request.field("Invoice Date", date);
            }
            let request = request
                .field("Account Number", &details.account_number)
                .field("Total Amount", details.total_amount)
                .field("Payment Due Date", details.payment_due_date)
                .field("Payment Mode", label(&details.payment_mode))
                .field("Payment Status", label(&invoice.payment_status()));
            self.render_report(request);
        }

        self.notify(Notification::new(
            parties(invoice.buyer_id(), invoice.vendor_id()),
            kind,
            json!({
                "invoice_id": invoice_id,
                "invoice_number": details.invoice_number,
            }),
        ));
    }
}

fn ensure_party(
    caller: &Principal,
    buyer_id: Option<UserId>,
    vendor_id: Option<VendorId>,
) -> Result<(), DispatchError> {
    if buyer_id == Some(caller.user_id) || vendor_id == Some(vendor_of(caller)) {
        Ok(())
    } else {
        Err(DispatchError::NotFound)
    }
}

fn parties(buyer_id: Option<UserId>, vendor_id: Option<VendorId>) -> Vec<UserId> {
    buyer_id
        .into_iter()
        .chain(vendor_id.map(|v| v.user_id()))
        .collect()
}

/// Serialized name of a unit enum variant ("damaged", "cheque", ...).
fn label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(JsonValue::String(s)) => s,
        _ => String::new(),
    }
}
