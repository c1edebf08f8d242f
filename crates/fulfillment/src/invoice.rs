use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, AggregateRoot, DomainError, Money, UserId};
use procura_events::Event;
use procura_parties::{MAX_RATING, MIN_RATING, VendorId};
use procura_purchasing::OrderId;

procura_core::typed_aggregate_id!(
    /// Invoice identifier.
    InvoiceId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Credit,
    Debit,
    Cash,
    Cheque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// Vendor-supplied billing details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDetails {
    pub invoice_number: String,
    pub account_number: String,
    pub total_amount: Money,
    pub payment_due_date: NaiveDate,
    pub payment_mode: PaymentMode,
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    order_id: Option<OrderId>,
    buyer_id: Option<UserId>,
    vendor_id: Option<VendorId>,
    invoice_date: Option<NaiveDate>,
    details: Option<InvoiceDetails>,
    payment_status: PaymentStatus,
    vendor_rated: bool,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            order_id: None,
            buyer_id: None,
            vendor_id: None,
            invoice_date: None,
            details: None,
            payment_status: PaymentStatus::Pending,
            vendor_rated: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn buyer_id(&self) -> Option<UserId> {
        self.buyer_id
    }

    pub fn vendor_id(&self) -> Option<VendorId> {
        self.vendor_id
    }

    pub fn invoice_date(&self) -> Option<NaiveDate> {
        self.invoice_date
    }

    pub fn details(&self) -> Option<&InvoiceDetails> {
        self.details.as_ref()
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn vendor_rated(&self) -> bool {
        self.vendor_rated
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: IssueInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueInvoice {
    pub invoice_id: InvoiceId,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub vendor_id: VendorId,
    pub details: InvoiceDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AmendInvoice (only while payment is pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendInvoice {
    pub invoice_id: InvoiceId,
    pub details: InvoiceDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkPaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkPaid {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RateVendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateVendor {
    pub invoice_id: InvoiceId,
    pub rating: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    IssueInvoice(IssueInvoice),
    AmendInvoice(AmendInvoice),
    MarkPaid(MarkPaid),
    RateVendor(RateVendor),
}

/// Event: InvoiceIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceIssued {
    pub invoice_id: InvoiceId,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub vendor_id: VendorId,
    pub details: InvoiceDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceAmended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceAmended {
    pub invoice_id: InvoiceId,
    pub details: InvoiceDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoicePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePaid {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: VendorRated. Sets the write-once `vendor_rated` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorRated {
    pub invoice_id: InvoiceId,
    pub vendor_id: VendorId,
    pub rating: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceIssued(InvoiceIssued),
    InvoiceAmended(InvoiceAmended),
    InvoicePaid(InvoicePaid),
    VendorRated(VendorRated),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceIssued(_) => "fulfillment.invoice.issued",
            InvoiceEvent::InvoiceAmended(_) => "fulfillment.invoice.amended",
            InvoiceEvent::InvoicePaid(_) => "fulfillment.invoice.paid",
            InvoiceEvent::VendorRated(_) => "fulfillment.invoice.vendor_rated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceIssued(e) => e.occurred_at,
            InvoiceEvent::InvoiceAmended(e) => e.occurred_at,
            InvoiceEvent::InvoicePaid(e) => e.occurred_at,
            InvoiceEvent::VendorRated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceIssued(e) => {
                self.id = e.invoice_id;
                self.order_id = Some(e.order_id);
                self.buyer_id = Some(e.buyer_id);
                self.vendor_id = Some(e.vendor_id);
                self.invoice_date = Some(e.occurred_at.date_naive());
                self.details = Some(e.details.clone());
                self.payment_status = PaymentStatus::Pending;
                self.vendor_rated = false;
                self.created = true;
            }
            InvoiceEvent::InvoiceAmended(e) => {
                self.details = Some(e.details.clone());
            }
            InvoiceEvent::InvoicePaid(_) => {
                self.payment_status = PaymentStatus::Paid;
            }
            InvoiceEvent::VendorRated(_) => {
                self.vendor_rated = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::IssueInvoice(cmd) => self.handle_issue(cmd),
            InvoiceCommand::AmendInvoice(cmd) => self.handle_amend(cmd),
            InvoiceCommand::MarkPaid(cmd) => self.handle_mark_paid(cmd),
            InvoiceCommand::RateVendor(cmd) => self.handle_rate(cmd),
        }
    }
}

impl Invoice {
    fn ensure_exists(&self, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if !self.created || self.id != invoice_id {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn validate_details(details: &InvoiceDetails) -> Result<(), DomainError> {
        if details.invoice_number.trim().is_empty() {
            return Err(DomainError::validation("invoice number cannot be empty"));
        }
        if details.account_number.trim().is_empty() {
            return Err(DomainError::validation("account number cannot be empty"));
        }
        Ok(())
    }

    fn handle_issue(&self, cmd: &IssueInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }
        Self::validate_details(&cmd.details)?;

        Ok(vec![InvoiceEvent::InvoiceIssued(InvoiceIssued {
            invoice_id: cmd.invoice_id,
            order_id: cmd.order_id,
            buyer_id: cmd.buyer_id,
            vendor_id: cmd.vendor_id,
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_amend(&self, cmd: &AmendInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_exists(cmd.invoice_id)?;
        if self.payment_status == PaymentStatus::Paid {
            return Err(DomainError::conflict("a paid invoice cannot be amended"));
        }
        Self::validate_details(&cmd.details)?;

        Ok(vec![InvoiceEvent::InvoiceAmended(InvoiceAmended {
            invoice_id: cmd.invoice_id,
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_paid(&self, cmd: &MarkPaid) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_exists(cmd.invoice_id)?;
        if self.payment_status == PaymentStatus::Paid {
            return Err(DomainError::conflict("invoice is already paid"));
        }

        Ok(vec![InvoiceEvent::InvoicePaid(InvoicePaid {
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_rate(&self, cmd: &RateVendor) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_exists(cmd.invoice_id)?;
        if !(MIN_RATING..=MAX_RATING).contains(&cmd.rating) {
            return Err(DomainError::validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
        if self.vendor_rated {
            return Err(DomainError::conflict("vendor has already been rated for this invoice"));
        }
        if self.payment_status != PaymentStatus::Paid {
            return Err(DomainError::conflict("only a paid invoice can be rated"));
        }
        let vendor_id = self.vendor_id.ok_or_else(DomainError::not_found)?;

        Ok(vec![InvoiceEvent::VendorRated(VendorRated {
            invoice_id: cmd.invoice_id,
            vendor_id,
            rating: cmd.rating,
            occurred_at: cmd.occurred_at,
        })])
    }
}
