//! Inventory items owned by procurement officers.

use chrono::Utc;
use serde_json::Value as JsonValue;

use procura_auth::{Capability, Principal, authorize};
use procura_events::{EventBus, EventEnvelope};
use procura_inventory::{
    AdjustStock, CreateItem, InventoryCommand, InventoryItem, InventoryItemId, ItemDetails,
    OptimizationParameters, OptimizationRecord, RecordOptimization, UpdateItemDetails,
};

use super::{Procurement, ensure_owner};
use crate::error::DispatchError;
use crate::event_store::EventStore;
use crate::unit_of_work::{Loaded, UnitOfWork};

impl<S, B> Procurement<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    #[tracing::instrument(skip_all, fields(user_id = %caller.user_id), err(level = "debug"))]
    pub fn create_item(
        &self,
        caller: &Principal,
        details: ItemDetails,
        initial_stock: i64,
    ) -> Result<InventoryItemId, DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;

        let item_id = InventoryItemId::generate();
        let mut item = self.load_item(item_id)?;

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut item,
            &InventoryCommand::CreateItem(CreateItem {
                item_id,
                owner: caller.user_id,
                details,
                initial_stock,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!(%item_id, initial_stock, "inventory item created");
        Ok(item_id)
    }

    #[tracing::instrument(skip_all, fields(%item_id), err(level = "debug"))]
    pub fn update_item(
        &self,
        caller: &Principal,
        item_id: InventoryItemId,
        details: ItemDetails,
    ) -> Result<(), DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;
        let mut item = self.owned_item(caller, item_id)?;

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut item,
            &InventoryCommand::UpdateItemDetails(UpdateItemDetails {
                item_id,
                details,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!("inventory item updated");
        Ok(())
    }

    /// Returns the resulting stock quantity.
    #[tracing::instrument(skip_all, fields(%item_id, delta = delta), err(level = "debug"))]
    pub fn adjust_stock(
        &self,
        caller: &Principal,
        item_id: InventoryItemId,
        delta: i64,
    ) -> Result<i64, DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;
        let mut item = self.owned_item(caller, item_id)?;

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut item,
            &InventoryCommand::AdjustStock(AdjustStock {
                item_id,
                delta,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        tracing::info!(stock = item.stock(), "stock adjusted");
        Ok(item.stock())
    }

    /// Compute and store the item's EOQ (and reorder levels when applicable).
    #[tracing::instrument(skip_all, fields(%item_id), err(level = "debug"))]
    pub fn optimize_item(
        &self,
        caller: &Principal,
        item_id: InventoryItemId,
        parameters: OptimizationParameters,
    ) -> Result<OptimizationRecord, DispatchError> {
        authorize(caller, Capability::ActAsProcurementOfficer)?;
        let mut item = self.owned_item(caller, item_id)?;

        let mut uow = UnitOfWork::new();
        uow.decide(
            &mut item,
            &InventoryCommand::RecordOptimization(RecordOptimization {
                item_id,
                parameters,
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.commit(uow)?;

        let record = item
            .optimization()
            .cloned()
            .ok_or(DispatchError::NotFound)?;
        tracing::info!(model = ?record.model, eoq = record.eoq, "optimization recorded");
        Ok(record)
    }

    pub fn item(
        &self,
        caller: &Principal,
        item_id: InventoryItemId,
    ) -> Result<InventoryItem, DispatchError> {
        Ok(self.owned_item(caller, item_id)?.into_inner())
    }

    fn owned_item(
        &self,
        caller: &Principal,
        item_id: InventoryItemId,
    ) -> Result<Loaded<InventoryItem>, DispatchError> {
        let item = self.existing_item(item_id)?;
        ensure_owner(item.owner(), caller)?;
        Ok(item)
    }
}
