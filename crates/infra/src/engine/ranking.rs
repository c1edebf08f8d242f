use serde_json::Value as JsonValue;

use procura_auth::{Capability, Principal, authorize};
use procura_events::{EventBus, EventEnvelope};
use procura_purchasing::{BidCandidate, BidRanking, CriteriaWeights, RequisitionId};

use super::Procurement;
use crate::error::DispatchError;
use crate::event_store::EventStore;

impl<S, B> Procurement<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// TOPSIS ranking of a requisition's bids. Read-only.
    #[tracing::instrument(skip_all, fields(%requisition_id), err(level = "debug"))]
    pub fn rank_bids(
        &self,
        caller: &Principal,
        requisition_id: RequisitionId,
        weights: &CriteriaWeights,
    ) -> Result<BidRanking, DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;
        let requisition = self.owned_requisition(caller, requisition_id)?;

        let mut candidates = Vec::with_capacity(requisition.bids().len());
        for registration in requisition.bids() {
            let bid = self.existing_bid(registration.bid_id)?;
            let vendor = self.existing_vendor(registration.vendor_id)?;
            let terms = bid.terms().ok_or(DispatchError::NotFound)?;
            let rating = vendor.rating();

            candidates.push(BidCandidate {
                bid_id: registration.bid_id,
                unit_price: terms.unit_price,
                fulfilled_quantity: terms.fulfilled_quantity,
                lead_time_days: terms.lead_time_days,
                vendor_rating: rating.rating,
                vendor_total_ratings: rating.total_ratings,
            });
        }

        let ranking = procura_purchasing::rank_bids(&candidates, weights)?;

        if let Some(best) = ranking.best() {
            tracing::info!(
                bids = ranking.ranked.len(),
                best = %best.bid_id,
                closeness = best.closeness,
                "bids ranked"
            );
        }
        Ok(ranking)
    }
}
