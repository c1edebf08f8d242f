//! Inventory domain module (event-sourced).
//!
//! Business rules for stocked items and their reorder optimization, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod item;
pub mod optimizer;

pub use item::{
    AdjustStock, BindRequisition, CreateItem, InventoryCommand, InventoryEvent, InventoryItem,
    InventoryItemId, ItemCreated, ItemDetails, ItemDetailsUpdated, OptimizationRecorded,
    RecordOptimization, ReleaseRequisition, RequisitionBound, RequisitionReleased, StockAdjusted,
    StockSnapshot, UpdateItemDetails,
};
pub use optimizer::{
    OptimizationModel, OptimizationParameters, OptimizationRecord, ReorderLevels, eoq_classical,
    eoq_limited_storage, eoq_perishable, eoq_with_rop, optimize, safety_stock_and_rop,
};
