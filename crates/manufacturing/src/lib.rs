//! Manufacturing domain module: bills of materials and manufacturing orders.

pub mod bom;
pub mod order;

pub use bom::{Bom, BomLine, ComponentRequirement};
pub use order::{
    CancelManufacturingOrder, CompleteManufacturingOrder, ConfirmManufacturingOrder,
    CreateManufacturingOrder, ManufacturingOrder, ManufacturingOrderCancelled,
    ManufacturingOrderCommand, ManufacturingOrderCompleted, ManufacturingOrderConfirmed,
    ManufacturingOrderCreated, ManufacturingOrderEvent, ManufacturingOrderId,
    ManufacturingOrderStatus,
};
