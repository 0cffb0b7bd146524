//! Ship-from-warehouse vs. vendor-direct (dropship) decisions.

pub mod decision;
pub mod desk;
pub mod quote;

pub use decision::{DropshipDecision, DropshipInputs, decide};
pub use desk::{DecisionRecord, DropshippingDesk};
pub use quote::{CarrierRates, RateTable, ShipFrom, ShippingRates};
