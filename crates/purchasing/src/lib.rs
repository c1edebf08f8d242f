//! Purchasing domain module (event-sourced).
//!
//! Requisitions, the bids raised against them, the orders an award produces,
//! and the multi-criteria ranking that supports the award decision. Pure,
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod bid;
pub mod order;
pub mod ranking;
pub mod requisition;

pub use bid::{
    AcceptBid, Bid, BidAccepted, BidCommand, BidEvent, BidId, BidRejected, BidRevised,
    BidStatus, BidSubmitted, BidTerms, BidWithdrawn, RejectBid, RejectionCause, ReviseBid,
    SubmitBid, WithdrawBid,
};
pub use order::{
    AdvanceStatus, AttachInvoice, AttachReceipt, InvoiceAttached, Order, OrderCommand,
    OrderEvent, OrderId, OrderPlaced, OrderStatus, OrderStatusAdvanced, PlaceOrder,
    ReceiptAttached, order_number_for,
};
pub use ranking::{
    BidCandidate, BidRanking, CriteriaWeights, Criterion, ParallelCoordinate, RadarSeries,
    RankedBid, rank_bids,
};
pub use requisition::{
    AwardBid, BidAwarded, BidRegistered, BidRegistration, BidUnregistered, DeleteRequisition,
    EditRequisition, OpenRequisition, RegisterBid, RejectRequisition, Requisition,
    RequisitionCommand, RequisitionDeleted, RequisitionDetails, RequisitionEdited,
    RequisitionEvent, RequisitionId, RequisitionOpened, RequisitionRejected, RequisitionStatus,
    UnregisterBid, Urgency,
};
