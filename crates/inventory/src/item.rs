use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use procura_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money, UserId};
use procura_events::Event;

use crate::optimizer::{self, OptimizationParameters, OptimizationRecord};

procura_core::typed_aggregate_id!(
    /// Inventory item identifier.
    InventoryItemId
);

/// Officer-maintained description of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub name: String,
    pub description: String,
    pub unit_price: Money,
    pub reorder_level: u32,
    pub location: String,
    pub expiration_date: Option<NaiveDate>,
}

/// Stock level recorded on a given day; the demand history consumed by forecasting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub date: NaiveDate,
    pub stock_quantity: i64,
}

/// Aggregate root: InventoryItem.
///
/// Holds the 1:1 binding to its open requisition, so that raising a second
/// requisition for the same item is rejected on the item's own stream.
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryItem {
    id: InventoryItemId,
    owner: Option<UserId>,
    details: Option<ItemDetails>,
    stock: i64,
    stock_history: Vec<StockSnapshot>,
    requisition: Option<AggregateId>,
    optimization: Option<OptimizationRecord>,
    version: u64,
    created: bool,
}

impl InventoryItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InventoryItemId) -> Self {
        Self {
            id,
            owner: None,
            details: None,
            stock: 0,
            stock_history: Vec::new(),
            requisition: None,
            optimization: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn details(&self) -> Option<&ItemDetails> {
        self.details.as_ref()
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn stock_history(&self) -> &[StockSnapshot] {
        &self.stock_history
    }

    /// The requisition currently raised for this item, if any.
    pub fn requisition(&self) -> Option<AggregateId> {
        self.requisition
    }

    pub fn optimization(&self) -> Option<&OptimizationRecord> {
        self.optimization.as_ref()
    }
}

impl AggregateRoot for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItem {
    pub item_id: InventoryItemId,
    pub owner: UserId,
    pub details: ItemDetails,
    pub initial_stock: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateItemDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemDetails {
    pub item_id: InventoryItemId,
    pub details: ItemDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub item_id: InventoryItemId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: BindRequisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindRequisition {
    pub item_id: InventoryItemId,
    pub requisition_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReleaseRequisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRequisition {
    pub item_id: InventoryItemId,
    pub requisition_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordOptimization.
///
/// Carries inputs only; the derived figures are computed while handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOptimization {
    pub item_id: InventoryItemId,
    pub parameters: OptimizationParameters,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InventoryCommand {
    CreateItem(CreateItem),
    UpdateItemDetails(UpdateItemDetails),
    AdjustStock(AdjustStock),
    BindRequisition(BindRequisition),
    ReleaseRequisition(ReleaseRequisition),
    RecordOptimization(RecordOptimization),
}

/// Event: ItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreated {
    pub item_id: InventoryItemId,
    pub owner: UserId,
    pub details: ItemDetails,
    pub initial_stock: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemDetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetailsUpdated {
    pub item_id: InventoryItemId,
    pub details: ItemDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub item_id: InventoryItemId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequisitionBound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionBound {
    pub item_id: InventoryItemId,
    pub requisition_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequisitionReleased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionReleased {
    pub item_id: InventoryItemId,
    pub requisition_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OptimizationRecorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecorded {
    pub item_id: InventoryItemId,
    pub record: OptimizationRecord,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InventoryEvent {
    ItemCreated(ItemCreated),
    ItemDetailsUpdated(ItemDetailsUpdated),
    StockAdjusted(StockAdjusted),
    RequisitionBound(RequisitionBound),
    RequisitionReleased(RequisitionReleased),
    OptimizationRecorded(OptimizationRecorded),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::ItemCreated(_) => "inventory.item.created",
            InventoryEvent::ItemDetailsUpdated(_) => "inventory.item.details_updated",
            InventoryEvent::StockAdjusted(_) => "inventory.item.stock_adjusted",
            InventoryEvent::RequisitionBound(_) => "inventory.item.requisition_bound",
            InventoryEvent::RequisitionReleased(_) => "inventory.item.requisition_released",
            InventoryEvent::OptimizationRecorded(_) => "inventory.item.optimization_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::ItemCreated(e) => e.occurred_at,
            InventoryEvent::ItemDetailsUpdated(e) => e.occurred_at,
            InventoryEvent::StockAdjusted(e) => e.occurred_at,
            InventoryEvent::RequisitionBound(e) => e.occurred_at,
            InventoryEvent::RequisitionReleased(e) => e.occurred_at,
            InventoryEvent::OptimizationRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryItem {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::ItemCreated(e) => {
                self.id = e.item_id;
                self.owner = Some(e.owner);
                self.details = Some(e.details.clone());
                self.stock = e.initial_stock;
                self.record_snapshot(e.occurred_at);
                self.created = true;
            }
            InventoryEvent::ItemDetailsUpdated(e) => {
                self.details = Some(e.details.clone());
            }
            InventoryEvent::StockAdjusted(e) => {
                // `handle_adjust` rejects overflowing deltas before they are recorded.
                self.stock = self.stock.saturating_add(e.delta);
                self.record_snapshot(e.occurred_at);
            }
            InventoryEvent::RequisitionBound(e) => {
                self.requisition = Some(e.requisition_id);
            }
            InventoryEvent::RequisitionReleased(_) => {
                self.requisition = None;
            }
            InventoryEvent::OptimizationRecorded(e) => {
                self.optimization = Some(e.record.clone());
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::CreateItem(cmd) => self.handle_create(cmd),
            InventoryCommand::UpdateItemDetails(cmd) => self.handle_update(cmd),
            InventoryCommand::AdjustStock(cmd) => self.handle_adjust(cmd),
            InventoryCommand::BindRequisition(cmd) => self.handle_bind(cmd),
            InventoryCommand::ReleaseRequisition(cmd) => self.handle_release(cmd),
            InventoryCommand::RecordOptimization(cmd) => self.handle_optimization(cmd),
        }
    }
}

impl InventoryItem {
    fn record_snapshot(&mut self, at: DateTime<Utc>) {
        self.stock_history.push(StockSnapshot {
            date: at.date_naive(),
            stock_quantity: self.stock,
        });
    }

    fn ensure_exists(&self, item_id: InventoryItemId) -> Result<(), DomainError> {
        if !self.created || self.id != item_id {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn validate_details(details: &ItemDetails) -> Result<(), DomainError> {
        if details.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if details.location.trim().is_empty() {
            return Err(DomainError::validation("location cannot be empty"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateItem) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("item already exists"));
        }
        Self::validate_details(&cmd.details)?;
        if cmd.initial_stock < 0 {
            return Err(DomainError::validation("stock quantity cannot be negative"));
        }

        Ok(vec![InventoryEvent::ItemCreated(ItemCreated {
            item_id: cmd.item_id,
            owner: cmd.owner,
            details: cmd.details.clone(),
            initial_stock: cmd.initial_stock,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateItemDetails) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_exists(cmd.item_id)?;
        Self::validate_details(&cmd.details)?;

        Ok(vec![InventoryEvent::ItemDetailsUpdated(ItemDetailsUpdated {
            item_id: cmd.item_id,
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_exists(cmd.item_id)?;

        if cmd.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let stock = self
            .stock
            .checked_add(cmd.delta)
            .ok_or_else(|| DomainError::validation("stock adjustment out of range"))?;
        if stock < 0 {
            return Err(DomainError::conflict("stock cannot go negative"));
        }

        Ok(vec![InventoryEvent::StockAdjusted(StockAdjusted {
            item_id: cmd.item_id,
            delta: cmd.delta,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_bind(&self, cmd: &BindRequisition) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_exists(cmd.item_id)?;

        if self.requisition.is_some() {
            return Err(DomainError::conflict("item already has a requisition"));
        }

        Ok(vec![InventoryEvent::RequisitionBound(RequisitionBound {
            item_id: cmd.item_id,
            requisition_id: cmd.requisition_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_release(&self, cmd: &ReleaseRequisition) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_exists(cmd.item_id)?;

        if self.requisition != Some(cmd.requisition_id) {
            return Err(DomainError::conflict(
                "requisition is not bound to this item",
            ));
        }

        Ok(vec![InventoryEvent::RequisitionReleased(RequisitionReleased {
            item_id: cmd.item_id,
            requisition_id: cmd.requisition_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_optimization(
        &self,
        cmd: &RecordOptimization,
    ) -> Result<Vec<InventoryEvent>, DomainError> {
        self.ensure_exists(cmd.item_id)?;

        let record = optimizer::optimize(&cmd.parameters)?;

        Ok(vec![InventoryEvent::OptimizationRecorded(OptimizationRecorded {
            item_id: cmd.item_id,
            record,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::OptimizationModel;
    use procura_events::execute;
    use rust_decimal::Decimal;

    fn test_item_id() -> InventoryItemId {
        InventoryItemId::generate()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_details() -> ItemDetails {
        ItemDetails {
            name: "Copper wire".to_string(),
            description: "2.5mm, 100m roll".to_string(),
            unit_price: Money::new(Decimal::new(1999, 2)).unwrap(),
            reorder_level: 10,
            location: "Warehouse A".to_string(),
            expiration_date: None,
        }
    }

    fn created_item(initial_stock: i64) -> InventoryItem {
        let item_id = test_item_id();
        let mut item = InventoryItem::empty(item_id);
        execute(
            &mut item,
            &InventoryCommand::CreateItem(CreateItem {
                item_id,
                owner: UserId::new(),
                details: test_details(),
                initial_stock,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        item
    }

    #[test]
    fn create_records_initial_stock_snapshot() {
        let item = created_item(25);

        assert!(item.exists());
        assert_eq!(item.stock(), 25);
        assert_eq!(item.version(), 1);
        assert_eq!(item.stock_history().len(), 1);
        assert_eq!(item.stock_history()[0].stock_quantity, 25);
    }

    #[test]
    fn create_rejects_blank_name_and_negative_stock() {
        let item = InventoryItem::empty(test_item_id());
        let mut details = test_details();
        details.name = "  ".to_string();

        let cmd = |details: ItemDetails, initial_stock: i64| {
            InventoryCommand::CreateItem(CreateItem {
                item_id: item.id_typed(),
                owner: UserId::new(),
                details,
                initial_stock,
                occurred_at: test_time(),
            })
        };

        assert!(matches!(item.handle(&cmd(details, 0)), Err(DomainError::Validation(_))));
        assert!(matches!(
            item.handle(&cmd(test_details(), -1)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn adjust_stock_appends_history_and_never_goes_negative() {
        let mut item = created_item(5);
        let item_id = item.id_typed();

        execute(
            &mut item,
            &InventoryCommand::AdjustStock(AdjustStock {
                item_id,
                delta: -3,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(item.stock(), 2);
        assert_eq!(item.stock_history().len(), 2);

        let err = item
            .handle(&InventoryCommand::AdjustStock(AdjustStock {
                item_id,
                delta: -3,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn overflowing_adjustment_is_rejected() {
        let item = created_item(5);
        let item_id = item.id_typed();

        let err = item
            .handle(&InventoryCommand::AdjustStock(AdjustStock {
                item_id,
                delta: i64::MAX,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(item.stock(), 5);
    }

    #[test]
    fn second_requisition_binding_is_a_conflict() {
        let mut item = created_item(0);
        let item_id = item.id_typed();
        let first = AggregateId::new();

        execute(
            &mut item,
            &InventoryCommand::BindRequisition(BindRequisition {
                item_id,
                requisition_id: first,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(item.requisition(), Some(first));

        let bind_again = InventoryCommand::BindRequisition(BindRequisition {
            item_id,
            requisition_id: AggregateId::new(),
            occurred_at: test_time(),
        });
        assert!(matches!(item.handle(&bind_again), Err(DomainError::Conflict(_))));

        execute(
            &mut item,
            &InventoryCommand::ReleaseRequisition(ReleaseRequisition {
                item_id,
                requisition_id: first,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(item.requisition(), None);
        assert!(item.handle(&bind_again).is_ok());
    }

    #[test]
    fn optimization_is_computed_not_supplied() {
        let mut item = created_item(0);
        let item_id = item.id_typed();

        execute(
            &mut item,
            &InventoryCommand::RecordOptimization(RecordOptimization {
                item_id,
                parameters: OptimizationParameters {
                    annual_demand: 100,
                    ordering_cost: Money::new(Decimal::from(10)).unwrap(),
                    holding_cost: Money::new(Decimal::from(5)).unwrap(),
                    lead_time_days: None,
                    service_level: None,
                    shelf_life_days: None,
                    storage_capacity: None,
                },
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let record = item.optimization().unwrap();
        assert_eq!(record.model, OptimizationModel::Classical);
        assert!((record.eoq - 20.0).abs() < 1e-9);
    }

    #[test]
    fn commands_against_missing_item_are_not_found() {
        let item = InventoryItem::empty(test_item_id());
        let err = item
            .handle(&InventoryCommand::AdjustStock(AdjustStock {
                item_id: item.id_typed(),
                delta: 1,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }
}
