//! Purchasing domain module (vendor-facing supply orders, event-sourced).
//!
//! Business rules for purchase orders implemented as deterministic domain logic
//! (no IO, no storage). Orders are spawned by the supply generator or confirmed by
//! collaborators; lines are merged per `(item, lot)`.

pub mod order;

pub use order::{
    AddLine, CancelPurchaseOrder, ConfirmPurchaseOrder, CreatePurchaseOrder, PurchaseOrder,
    PurchaseOrderCancelled, PurchaseOrderCommand, PurchaseOrderConfirmed, PurchaseOrderCreated,
    PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderLine, PurchaseOrderLineAdded,
    PurchaseOrderLineIncreased, PurchaseOrderLineReduced, PurchaseOrderStatus, ReduceLine,
};
