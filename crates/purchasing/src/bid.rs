use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, AggregateRoot, DomainError, Money};
use procura_events::Event;
use procura_parties::VendorId;

use crate::order::OrderId;
use crate::requisition::RequisitionId;

procura_core::typed_aggregate_id!(
    /// Bid identifier.
    BidId
);

/// Bid lifecycle. Accepted and rejected are set only by an award decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Submitted,
    Accepted,
    Rejected,
}

/// Vendor-supplied terms of a bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidTerms {
    pub fulfilled_quantity: u32,
    pub unit_price: Money,
    pub lead_time_days: u32,
    pub comments: Option<String>,
}

impl BidTerms {
    /// Unit price × fulfilled quantity.
    pub fn total_cost(&self) -> Result<Money, DomainError> {
        self.unit_price.times(self.fulfilled_quantity)
    }

    fn validate(&self, minimum_quantity: u32) -> Result<(), DomainError> {
        if self.fulfilled_quantity < minimum_quantity {
            return Err(DomainError::validation(format!(
                "fulfilled quantity {} is below the requested quantity {minimum_quantity}",
                self.fulfilled_quantity
            )));
        }
        if self.lead_time_days < 1 {
            return Err(DomainError::validation("lead time must be at least 1 day"));
        }
        // Ranking scores the total cost, so it must be representable.
        self.total_cost()?;
        Ok(())
    }
}

/// Why a bid is being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCause {
    /// The officer declined this bid directly.
    Declined,
    /// A sibling bid was awarded.
    OutbidOnAward,
}

/// Aggregate root: Bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bid {
    id: BidId,
    requisition_id: Option<RequisitionId>,
    vendor_id: Option<VendorId>,
    terms: Option<BidTerms>,
    status: BidStatus,
    order_id: Option<OrderId>,
    withdrawn: bool,
    version: u64,
    created: bool,
}

impl Bid {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: BidId) -> Self {
        Self {
            id,
            requisition_id: None,
            vendor_id: None,
            terms: None,
            status: BidStatus::Submitted,
            order_id: None,
            withdrawn: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> BidId {
        self.id
    }

    /// Submitted and not withdrawn.
    pub fn exists(&self) -> bool {
        self.created && !self.withdrawn
    }

    pub fn requisition_id(&self) -> Option<RequisitionId> {
        self.requisition_id
    }

    pub fn vendor_id(&self) -> Option<VendorId> {
        self.vendor_id
    }

    pub fn terms(&self) -> Option<&BidTerms> {
        self.terms.as_ref()
    }

    pub fn status(&self) -> BidStatus {
        self.status
    }

    /// The order created when this bid was accepted.
    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }
}

impl AggregateRoot for Bid {
    type Id = BidId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitBid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBid {
    pub bid_id: BidId,
    pub requisition_id: RequisitionId,
    pub vendor_id: VendorId,
    /// The requisition's requested quantity at submission time.
    pub minimum_quantity: u32,
    pub terms: BidTerms,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReviseBid. An edited bid re-enters consideration as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviseBid {
    pub bid_id: BidId,
    pub minimum_quantity: u32,
    /// Whether the parent requisition is still pending.
    pub requisition_open: bool,
    pub terms: BidTerms,
    pub occurred_at: DateTime<Utc>,
}

/// Command: WithdrawBid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawBid {
    pub bid_id: BidId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AcceptBid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptBid {
    pub bid_id: BidId,
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectBid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectBid {
    pub bid_id: BidId,
    pub cause: RejectionCause,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidCommand {
    SubmitBid(SubmitBid),
    ReviseBid(ReviseBid),
    WithdrawBid(WithdrawBid),
    AcceptBid(AcceptBid),
    RejectBid(RejectBid),
}

/// Event: BidSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidSubmitted {
    pub bid_id: BidId,
    pub requisition_id: RequisitionId,
    pub vendor_id: VendorId,
    pub terms: BidTerms,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BidRevised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRevised {
    pub bid_id: BidId,
    pub terms: BidTerms,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BidWithdrawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidWithdrawn {
    pub bid_id: BidId,
    pub requisition_id: RequisitionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BidAccepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidAccepted {
    pub bid_id: BidId,
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BidRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRejected {
    pub bid_id: BidId,
    pub cause: RejectionCause,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidEvent {
    BidSubmitted(BidSubmitted),
    BidRevised(BidRevised),
    BidWithdrawn(BidWithdrawn),
    BidAccepted(BidAccepted),
    BidRejected(BidRejected),
}

impl Event for BidEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BidEvent::BidSubmitted(_) => "purchasing.bid.submitted",
            BidEvent::BidRevised(_) => "purchasing.bid.revised",
            BidEvent::BidWithdrawn(_) => "purchasing.bid.withdrawn",
            BidEvent::BidAccepted(_) => "purchasing.bid.accepted",
            BidEvent::BidRejected(_) => "purchasing.bid.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BidEvent::BidSubmitted(e) => e.occurred_at,
            BidEvent::BidRevised(e) => e.occurred_at,
            BidEvent::BidWithdrawn(e) => e.occurred_at,
            BidEvent::BidAccepted(e) => e.occurred_at,
            BidEvent::BidRejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Bid {
    type Command = BidCommand;
    type Event = BidEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            BidEvent::BidSubmitted(e) => {
                self.id = e.bid_id;
                self.requisition_id = Some(e.requisition_id);
                self.vendor_id = Some(e.vendor_id);
                self.terms = Some(e.terms.clone());
                self.status = BidStatus::Submitted;
                self.created = true;
            }
            BidEvent::BidRevised(e) => {
                self.terms = Some(e.terms.clone());
                self.status = BidStatus::Submitted;
            }
            BidEvent::BidWithdrawn(_) => {
                self.withdrawn = true;
            }
            BidEvent::BidAccepted(e) => {
                self.status = BidStatus::Accepted;
                self.order_id = Some(e.order_id);
            }
            BidEvent::BidRejected(_) => {
                self.status = BidStatus::Rejected;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            BidCommand::SubmitBid(cmd) => self.handle_submit(cmd),
            BidCommand::ReviseBid(cmd) => self.handle_revise(cmd),
            BidCommand::WithdrawBid(cmd) => self.handle_withdraw(cmd),
            BidCommand::AcceptBid(cmd) => self.handle_accept(cmd),
            BidCommand::RejectBid(cmd) => self.handle_reject(cmd),
        }
    }
}

impl Bid {
    fn ensure_exists(&self, bid_id: BidId) -> Result<(), DomainError> {
        if !self.exists() || self.id != bid_id {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_not_accepted(&self) -> Result<(), DomainError> {
        if self.status == BidStatus::Accepted {
            return Err(DomainError::conflict("bid has already been accepted"));
        }
        Ok(())
    }

    /// A decision is write-once: only a submitted bid can be accepted or declined.
    fn ensure_undecided(&self) -> Result<(), DomainError> {
        if self.status != BidStatus::Submitted {
            return Err(DomainError::conflict("bid status has already been modified"));
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitBid) -> Result<Vec<BidEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("bid already exists"));
        }
        cmd.terms.validate(cmd.minimum_quantity)?;

        Ok(vec![BidEvent::BidSubmitted(BidSubmitted {
            bid_id: cmd.bid_id,
            requisition_id: cmd.requisition_id,
            vendor_id: cmd.vendor_id,
            terms: cmd.terms.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revise(&self, cmd: &ReviseBid) -> Result<Vec<BidEvent>, DomainError> {
        self.ensure_exists(cmd.bid_id)?;
        self.ensure_not_accepted()?;
        if !cmd.requisition_open {
            return Err(DomainError::conflict(
                "bids cannot be edited once the requisition is closed",
            ));
        }
        cmd.terms.validate(cmd.minimum_quantity)?;

        Ok(vec![BidEvent::BidRevised(BidRevised {
            bid_id: cmd.bid_id,
            terms: cmd.terms.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(&self, cmd: &WithdrawBid) -> Result<Vec<BidEvent>, DomainError> {
        self.ensure_exists(cmd.bid_id)?;
        self.ensure_not_accepted()?;
        let requisition_id = self.requisition_id.ok_or_else(DomainError::not_found)?;

        Ok(vec![BidEvent::BidWithdrawn(BidWithdrawn {
            bid_id: cmd.bid_id,
            requisition_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_accept(&self, cmd: &AcceptBid) -> Result<Vec<BidEvent>, DomainError> {
        self.ensure_exists(cmd.bid_id)?;
        self.ensure_undecided()?;

        Ok(vec![BidEvent::BidAccepted(BidAccepted {
            bid_id: cmd.bid_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectBid) -> Result<Vec<BidEvent>, DomainError> {
        self.ensure_exists(cmd.bid_id)?;

        match cmd.cause {
            RejectionCause::Declined => self.ensure_undecided()?,
            RejectionCause::OutbidOnAward => {
                self.ensure_not_accepted()?;
                if self.status == BidStatus::Rejected {
                    return Ok(Vec::new());
                }
            }
        }

        Ok(vec![BidEvent::BidRejected(BidRejected {
            bid_id: cmd.bid_id,
            cause: cmd.cause,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procura_core::UserId;
    use procura_events::execute;
    use rust_decimal::Decimal;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_terms(fulfilled_quantity: u32, unit_price: i64) -> BidTerms {
        BidTerms {
            fulfilled_quantity,
            unit_price: Money::new(Decimal::from(unit_price)).unwrap(),
            lead_time_days: 7,
            comments: None,
        }
    }

    fn submitted_bid() -> Bid {
        let bid_id = BidId::generate();
        let mut bid = Bid::empty(bid_id);
        execute(
            &mut bid,
            &BidCommand::SubmitBid(SubmitBid {
                bid_id,
                requisition_id: RequisitionId::generate(),
                vendor_id: VendorId::for_user(UserId::new()),
                minimum_quantity: 50,
                terms: test_terms(50, 10),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        bid
    }

    fn decide(bid: &mut Bid, accept: bool) -> Result<Vec<BidEvent>, DomainError> {
        let bid_id = bid.id_typed();
        let cmd = if accept {
            BidCommand::AcceptBid(AcceptBid {
                bid_id,
                order_id: OrderId::generate(),
                occurred_at: test_time(),
            })
        } else {
            BidCommand::RejectBid(RejectBid {
                bid_id,
                cause: RejectionCause::Declined,
                occurred_at: test_time(),
            })
        };
        execute(bid, &cmd)
    }

    fn revise(bid: &mut Bid, requisition_open: bool) -> Result<Vec<BidEvent>, DomainError> {
        let bid_id = bid.id_typed();
        execute(
            bid,
            &BidCommand::ReviseBid(ReviseBid {
                bid_id,
                minimum_quantity: 50,
                requisition_open,
                terms: test_terms(55, 9),
                occurred_at: test_time(),
            }),
        )
    }

    #[test]
    fn total_cost_is_exact() {
        let terms = BidTerms {
            fulfilled_quantity: 3,
            unit_price: Money::new(Decimal::new(1010, 2)).unwrap(),
            lead_time_days: 1,
            comments: None,
        };
        assert_eq!(terms.total_cost().unwrap().amount(), Decimal::new(3030, 2));
    }

    #[test]
    fn submit_validates_quantity_and_lead_time() {
        let bid = Bid::empty(BidId::generate());
        let submit = |terms: BidTerms| {
            bid.handle(&BidCommand::SubmitBid(SubmitBid {
                bid_id: bid.id_typed(),
                requisition_id: RequisitionId::generate(),
                vendor_id: VendorId::for_user(UserId::new()),
                minimum_quantity: 50,
                terms,
                occurred_at: test_time(),
            }))
        };

        assert!(matches!(submit(test_terms(49, 10)), Err(DomainError::Validation(_))));

        let mut no_lead_time = test_terms(50, 10);
        no_lead_time.lead_time_days = 0;
        assert!(matches!(submit(no_lead_time), Err(DomainError::Validation(_))));

        let mut unpriceable = test_terms(50, 10);
        unpriceable.unit_price = Money::new(Decimal::MAX).unwrap();
        assert!(matches!(submit(unpriceable), Err(DomainError::Validation(_))));
    }

    #[test]
    fn decision_is_write_once() {
        let mut bid = submitted_bid();
        decide(&mut bid, true).unwrap();
        assert_eq!(bid.status(), BidStatus::Accepted);
        assert!(bid.order_id().is_some());

        assert!(matches!(decide(&mut bid, true), Err(DomainError::Conflict(_))));
        assert!(matches!(decide(&mut bid, false), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn accepted_bid_cannot_be_edited_or_withdrawn() {
        let mut bid = submitted_bid();
        decide(&mut bid, true).unwrap();
        let bid_id = bid.id_typed();

        assert!(matches!(revise(&mut bid, true), Err(DomainError::Conflict(_))));
        assert!(matches!(
            execute(
                &mut bid,
                &BidCommand::WithdrawBid(WithdrawBid {
                    bid_id,
                    occurred_at: test_time(),
                }),
            ),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn editing_a_declined_bid_resets_it_to_submitted() {
        let mut bid = submitted_bid();
        decide(&mut bid, false).unwrap();
        assert_eq!(bid.status(), BidStatus::Rejected);

        revise(&mut bid, true).unwrap();
        assert_eq!(bid.status(), BidStatus::Submitted);
        assert_eq!(bid.terms().unwrap().fulfilled_quantity, 55);
    }

    #[test]
    fn editing_after_the_requisition_closed_is_a_conflict() {
        let mut bid = submitted_bid();
        assert!(matches!(revise(&mut bid, false), Err(DomainError::Conflict(_))));
        assert_eq!(bid.status(), BidStatus::Submitted);
    }

    #[test]
    fn outbid_rejection_is_idempotent_for_already_rejected_bids() {
        let mut bid = submitted_bid();
        decide(&mut bid, false).unwrap();
        let version = bid.version();

        let events = bid
            .handle(&BidCommand::RejectBid(RejectBid {
                bid_id: bid.id_typed(),
                cause: RejectionCause::OutbidOnAward,
                occurred_at: test_time(),
            }))
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(bid.version(), version);
    }

    #[test]
    fn withdrawn_bid_is_gone() {
        let mut bid = submitted_bid();
        let bid_id = bid.id_typed();
        execute(
            &mut bid,
            &BidCommand::WithdrawBid(WithdrawBid {
                bid_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert!(!bid.exists());
        assert_eq!(decide(&mut bid, true), Err(DomainError::NotFound));
    }
}
