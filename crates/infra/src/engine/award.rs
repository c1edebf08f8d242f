//! Award decisions: the only path that moves a bid to `accepted`.
//!
//! Accepting a bid writes, in one commit:
//! - the requisition (`approved`, awarded bid recorded),
//! - the winning bid (`accepted`, bound to the new order),
//! - every sibling bid (`rejected`),
//! - a new order in `pending`.
//!
//! Every stream is committed at the version it was loaded at. Two concurrent
//! accepts on sibling bids both write the requisition stream from the same
//! version, so at most one of them commits; the other fails with Conflict and
//! leaves nothing behind.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use procura_auth::{Capability, Principal, authorize};
use procura_events::{EventBus, EventEnvelope};
use procura_purchasing::{
    AcceptBid, AwardBid, BidCommand, BidId, OrderCommand, OrderId, PlaceOrder, RejectBid,
    RejectionCause, RequisitionCommand, order_number_for,
};

use super::Procurement;
use crate::error::DispatchError;
use crate::event_store::EventStore;
use crate::side_effects::{Notification, NotificationKind};
use crate::unit_of_work::UnitOfWork;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardOutcome {
    pub bid_id: BidId,
    pub decision: Decision,
    /// Set when the bid was accepted.
    pub order_id: Option<OrderId>,
    pub order_number: Option<String>,
    /// Siblings rejected by this award.
    pub rejected_bids: Vec<BidId>,
}

impl<S, B> Procurement<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Accept or decline a submitted bid on one of the caller's requisitions.
    ///
    /// The decision is write-once: a bid that is no longer `submitted` fails
    /// with Conflict.
    #[tracing::instrument(skip_all, fields(%bid_id, ?decision), err(level = "debug"))]
    pub fn decide(
        &self,
        caller: &Principal,
        bid_id: BidId,
        decision: Decision,
    ) -> Result<AwardOutcome, DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;

        match decision {
            Decision::Accept => self.accept(caller, bid_id),
            Decision::Reject => self.decline(caller, bid_id),
        }
    }

    fn decline(&self, caller: &Principal, bid_id: BidId) -> Result<AwardOutcome, DispatchError> {
        let mut bid = self.existing_bid(bid_id)?;
        let requisition_id = bid.requisition_id().ok_or(DispatchError::NotFound)?;
        let requisition = self.owned_requisition(caller, requisition_id)?;
        let vendor_id = bid.vendor_id().ok_or(DispatchError::NotFound)?;

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut bid,
            &BidCommand::RejectBid(RejectBid {
                bid_id,
                cause: RejectionCause::Declined,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!("bid declined");

        self.notify(Notification::new(
            [vendor_id.user_id()],
            NotificationKind::BidRejected,
            json!({
                "requisition_number": requisition.requisition_number(),
                "bid_id": bid_id,
            }),
        ));

        Ok(AwardOutcome {
            bid_id,
            decision: Decision::Reject,
            order_id: None,
            order_number: None,
            rejected_bids: Vec::new(),
        })
    }

    fn accept(&self, caller: &Principal, bid_id: BidId) -> Result<AwardOutcome, DispatchError> {
        let mut bid = self.existing_bid(bid_id)?;
        let requisition_id = bid.requisition_id().ok_or(DispatchError::NotFound)?;
        let mut requisition = self.owned_requisition(caller, requisition_id)?;
        let winner = bid.vendor_id().ok_or(DispatchError::NotFound)?;

        let mut siblings = requisition
            .bid_ids()
            .filter(|id| *id != bid_id)
            .map(|id| self.existing_bid(id))
            .collect::<Result<Vec<_>, _>>()?;

        let order_id = OrderId::generate();
        let mut order = self.load_order(order_id)?;
        let order_number = order_number_for(requisition.requisition_number());
        let now = Utc::now();

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut requisition,
            &RequisitionCommand::AwardBid(AwardBid {
                requisition_id,
                bid_id,
                occurred_at: now,
            }),
        )?;
        uow.decide(
            &mut bid,
            &BidCommand::AcceptBid(AcceptBid {
                bid_id,
                order_id,
                occurred_at: now,
            }),
        )?;

        let mut rejected = Vec::with_capacity(siblings.len());
        for sibling in &mut siblings {
            let sibling_id = sibling.id_typed();
            let events = uow.decide(
                sibling,
                &BidCommand::RejectBid(RejectBid {
                    bid_id: sibling_id,
                    cause: RejectionCause::OutbidOnAward,
                    occurred_at: now,
                }),
            )?;
            if !events.is_empty() {
                if let Some(vendor_id) = sibling.vendor_id() {
                    rejected.push((sibling_id, vendor_id));
                }
            }
        }

        uow.decide(
            &mut order,
            &OrderCommand::PlaceOrder(PlaceOrder {
                order_id,
                order_number: order_number.clone(),
                bid_id,
                requisition_id,
                vendor_id: winner,
                buyer_id: caller.user_id,
                occurred_at: now,
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!(
            %order_id,
            %order_number,
            rejected = rejected.len(),
            "bid accepted and order placed"
        );

        let requisition_number = requisition.requisition_number();
        self.notify(Notification::new(
            [winner.user_id()],
            NotificationKind::BidAccepted,
            json!({
                "requisition_number": requisition_number,
                "bid_id": bid_id,
                "order_number": order_number,
            }),
        ));
        for (sibling_id, vendor_id) in &rejected {
            self.notify(Notification::new(
                [vendor_id.user_id()],
                NotificationKind::BidRejected,
                json!({
                    "requisition_number": requisition_number,
                    "bid_id": sibling_id,
                }),
            ));
        }
        self.notify(Notification::new(
            [caller.user_id],
            NotificationKind::RequisitionApproved,
            json!({
                "requisition_number": requisition_number,
                "bid_id": bid_id,
            }),
        ));
        self.notify(Notification::new(
            [caller.user_id, winner.user_id()],
            NotificationKind::OrderCreated,
            json!({
                "order_number": order_number,
                "order_id": order_id,
            }),
        ));

        Ok(AwardOutcome {
            bid_id,
            decision: Decision::Accept,
            order_id: Some(order_id),
            order_number: Some(order_number),
            rejected_bids: rejected.into_iter().map(|(id, _)| id).collect(),
        })
    }
}
