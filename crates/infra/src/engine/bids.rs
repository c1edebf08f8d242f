//! Bid submission, revision and withdrawal by vendors.

use chrono::Utc;
use serde_json::{Value as JsonValue, json};

use procura_auth::{Capability, Principal, authorize};
use procura_events::{EventBus, EventEnvelope};
use procura_purchasing::{
    Bid, BidCommand, BidId, BidTerms, RegisterBid, RequisitionCommand, RequisitionId, ReviseBid,
    SubmitBid, UnregisterBid, WithdrawBid,
};

use super::{Procurement, ensure_owner, vendor_of};
use crate::error::DispatchError;
use crate::event_store::EventStore;
use crate::side_effects::{Notification, NotificationKind};
use crate::unit_of_work::UnitOfWork;

impl<S, B> Procurement<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Submit the caller's bid on a pending requisition.
    ///
    /// The bid is registered on the requisition in the same commit, which is
    /// where the one-bid-per-vendor rule is enforced.
    #[tracing::instrument(
        skip_all,
        fields(user_id = %caller.user_id, %requisition_id),
        err(level = "debug")
    )]
    pub fn submit_bid(
        &self,
        caller: &Principal,
        requisition_id: RequisitionId,
        terms: BidTerms,
    ) -> Result<BidId, DispatchError> {
        authorize(caller, Capability::ActAsVendor)?;

        let vendor = self.existing_vendor(vendor_of(caller))?;
        let vendor_id = vendor.id_typed();
        let mut requisition = self.existing_requisition(requisition_id)?;

        let bid_id = BidId::generate();
        let mut bid = self.load_bid(bid_id)?;
        let now = Utc::now();

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut requisition,
            &RequisitionCommand::RegisterBid(RegisterBid {
                requisition_id,
                bid_id,
                vendor_id,
                fulfilled_quantity: terms.fulfilled_quantity,
                occurred_at: now,
            }),
        )?;
        uow.decide(
            &mut bid,
            &BidCommand::SubmitBid(SubmitBid {
                bid_id,
                requisition_id,
                vendor_id,
                minimum_quantity: requisition.requested_quantity(),
                terms,
                occurred_at: now,
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!(%bid_id, %vendor_id, "bid submitted");

        let vendor_name = vendor.profile().map(|p| p.name.clone()).unwrap_or_default();
        self.notify(Notification::new(
            requisition.owner(),
            NotificationKind::BidSubmitted,
            json!({
                "requisition_number": requisition.requisition_number(),
                "bid_id": bid_id,
                "vendor": vendor_name,
            }),
        ));

        Ok(bid_id)
    }

    /// Revise the caller's bid.
    ///
    /// The bid goes back to `submitted` for re-evaluation. Fails with Conflict
    /// once the bid is accepted or the requisition is no longer pending.
    #[tracing::instrument(skip_all, fields(%bid_id), err(level = "debug"))]
    pub fn edit_bid(
        &self,
        caller: &Principal,
        bid_id: BidId,
        terms: BidTerms,
    ) -> Result<(), DispatchError> {
        authorize(caller, Capability::ActAsVendor)?;

        let mut bid = self.own_bid(caller, bid_id)?;
        let requisition_id = bid.requisition_id().ok_or(DispatchError::NotFound)?;
        let requisition = self.existing_requisition(requisition_id)?;

        let mut uow = UnitOfWork::new();
        // The pending status read below must still hold at commit.
        uow.guard(&requisition);
        uow.decide(
            &mut bid,
            &BidCommand::ReviseBid(ReviseBid {
                bid_id,
                minimum_quantity: requisition.requested_quantity(),
                requisition_open: requisition.is_pending(),
                terms,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!("bid revised");

        self.notify(Notification::new(
            requisition.owner(),
            NotificationKind::BidUpdated,
            json!({
                "requisition_number": requisition.requisition_number(),
                "bid_id": bid_id,
            }),
        ));

        Ok(())
    }

    /// Withdraw the caller's bid; the vendor may bid on the requisition again.
    #[tracing::instrument(skip_all, fields(%bid_id), err(level = "debug"))]
    pub fn withdraw_bid(&self, caller: &Principal, bid_id: BidId) -> Result<(), DispatchError> {
        authorize(caller, Capability::ActAsVendor)?;

        let mut bid = self.own_bid(caller, bid_id)?;
        let requisition_id = bid.requisition_id().ok_or(DispatchError::NotFound)?;
        let mut requisition = self.load_requisition(requisition_id)?;
        let now = Utc::now();

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut bid,
            &BidCommand::WithdrawBid(WithdrawBid {
                bid_id,
                occurred_at: now,
            }),
        )?;
        // A deleted requisition has nothing left to unregister from.
        if requisition.exists() {
            uow.decide(
                &mut requisition,
                &RequisitionCommand::UnregisterBid(UnregisterBid {
                    requisition_id,
                    bid_id,
                    occurred_at: now,
                }),
            )?;
        }
        self.repository.commit(uow)?;

        tracing::info!("bid withdrawn");
        Ok(())
    }

    /// Vendors see their own bids; officers see bids on their requisitions.
    pub fn bid(&self, caller: &Principal, bid_id: BidId) -> Result<Bid, DispatchError> {
        let bid = self.existing_bid(bid_id)?;
        if bid.vendor_id() == Some(vendor_of(caller)) {
            return Ok(bid.into_inner());
        }

        let requisition_id = bid.requisition_id().ok_or(DispatchError::NotFound)?;
        let requisition = self.load_requisition(requisition_id)?;
        ensure_owner(requisition.owner(), caller)?;
        Ok(bid.into_inner())
    }

    /// Every live bid on one of the caller's requisitions, in submission order.
    pub fn bids_for_requisition(
        &self,
        caller: &Principal,
        requisition_id: RequisitionId,
    ) -> Result<Vec<Bid>, DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;
        let requisition = self.owned_requisition(caller, requisition_id)?;

        requisition
            .bid_ids()
            .map(|id| self.existing_bid(id).map(|b| b.into_inner()))
            .collect()
    }
}
