//! Requisition lifecycle: create, edit, reject, delete.
//!
//! An item carries at most one live requisition. Creation binds it on the item
//! stream and deletion releases it, each in the same commit as the
//! requisition's own event, so two concurrent creations for one item cannot
//! both succeed.

use chrono::Utc;
use serde_json::Value as JsonValue;

use procura_auth::{Capability, Principal, authorize};
use procura_events::{EventBus, EventEnvelope};
use procura_inventory::{BindRequisition, InventoryCommand, InventoryItemId, ReleaseRequisition};
use procura_purchasing::{
    DeleteRequisition, EditRequisition, OpenRequisition, RejectRequisition, Requisition,
    RequisitionCommand, RequisitionDetails, RequisitionId,
};

use super::{Procurement, ensure_owner, vendor_of};
use crate::error::DispatchError;
use crate::event_store::EventStore;
use crate::unit_of_work::UnitOfWork;

impl<S, B> Procurement<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    #[tracing::instrument(skip_all, fields(%item_id), err(level = "debug"))]
    pub fn create_requisition(
        &self,
        caller: &Principal,
        item_id: InventoryItemId,
        requisition_number: &str,
        details: RequisitionDetails,
    ) -> Result<RequisitionId, DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;

        let mut item = self.existing_item(item_id)?;
        ensure_owner(item.owner(), caller)?;

        let requisition_id = RequisitionId::generate();
        let mut requisition = self.load_requisition(requisition_id)?;
        let now = Utc::now();

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut item,
            &InventoryCommand::BindRequisition(BindRequisition {
                item_id,
                requisition_id: requisition_id.aggregate_id(),
                occurred_at: now,
            }),
        )?;
        uow.decide(
            &mut requisition,
            &RequisitionCommand::OpenRequisition(OpenRequisition {
                requisition_id,
                item_id,
                owner: caller.user_id,
                requisition_number: requisition_number.to_string(),
                details,
                occurred_at: now,
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!(%requisition_id, "requisition created");
        Ok(requisition_id)
    }

    /// Edit a pending requisition.
    #[tracing::instrument(skip_all, fields(%requisition_id), err(level = "debug"))]
    pub fn edit_requisition(
        &self,
        caller: &Principal,
        requisition_id: RequisitionId,
        details: RequisitionDetails,
    ) -> Result<(), DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;
        let mut requisition = self.owned_requisition(caller, requisition_id)?;

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut requisition,
            &RequisitionCommand::EditRequisition(EditRequisition {
                requisition_id,
                details,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!("requisition edited");
        Ok(())
    }

    /// Close a pending requisition without an award.
    #[tracing::instrument(skip_all, fields(%requisition_id), err(level = "debug"))]
    pub fn reject_requisition(
        &self,
        caller: &Principal,
        requisition_id: RequisitionId,
    ) -> Result<(), DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;
        let mut requisition = self.owned_requisition(caller, requisition_id)?;

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut requisition,
            &RequisitionCommand::RejectRequisition(RejectRequisition {
                requisition_id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!("requisition rejected");
        Ok(())
    }

    /// Delete a requisition that was never approved and free its item.
    #[tracing::instrument(skip_all, fields(%requisition_id), err(level = "debug"))]
    pub fn delete_requisition(
        &self,
        caller: &Principal,
        requisition_id: RequisitionId,
    ) -> Result<(), DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;
        let mut requisition = self.owned_requisition(caller, requisition_id)?;
        let item_id = requisition.item_id().ok_or(DispatchError::NotFound)?;
        let mut item = self.existing_item(item_id)?;
        let now = Utc::now();

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut requisition,
            &RequisitionCommand::DeleteRequisition(DeleteRequisition {
                requisition_id,
                occurred_at: now,
            }),
        )?;
        uow.decide(
            &mut item,
            &InventoryCommand::ReleaseRequisition(ReleaseRequisition {
                item_id,
                requisition_id: requisition_id.aggregate_id(),
                occurred_at: now,
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!(%item_id, "requisition deleted");
        Ok(())
    }

    /// Officers see their own requisitions; vendors see pending ones and
    /// those they have bid on.
    pub fn requisition(
        &self,
        caller: &Principal,
        requisition_id: RequisitionId,
    ) -> Result<Requisition, DispatchError> {
        let requisition = self.existing_requisition(requisition_id)?;

        let visible = requisition.owner() == Some(caller.user_id)
            || (caller.can_act_as_vendor()
                && (requisition.is_pending()
                    || requisition
                        .bids()
                        .iter()
                        .any(|b| b.vendor_id == vendor_of(caller))));
        if !visible {
            return Err(DispatchError::NotFound);
        }
        Ok(requisition.into_inner())
    }
}
