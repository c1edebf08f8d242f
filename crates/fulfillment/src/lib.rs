//! Fulfillment domain module (event-sourced).
//!
//! Receipts and invoices filed against delivered orders, and the payment and
//! vendor-rating steps that close an order out.

pub mod invoice;
pub mod receipt;

pub use invoice::{
    AmendInvoice, Invoice, InvoiceAmended, InvoiceCommand, InvoiceDetails, InvoiceEvent,
    InvoiceId, InvoiceIssued, InvoicePaid, IssueInvoice, MarkPaid, PaymentMode, PaymentStatus,
    RateVendor, VendorRated,
};
pub use receipt::{
    AmendReceipt, FileReceipt, Receipt, ReceiptAmended, ReceiptCommand, ReceiptDetails,
    ReceiptEvent, ReceiptFiled, ReceiptId, ReceivedCondition,
};
