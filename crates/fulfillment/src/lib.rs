//! Fulfillment resolution engine.
//!
//! Confirmed orders become [`Trigger`]s anchored at a destination zone. The scheduler
//! resolves each trigger through the rule graph into [`Move`]s and [`MoveLine`]s,
//! reserving stock, chaining demand upstream or generating purchase and manufacturing
//! orders when stock is short. Shortages are tracked as [`Intervention`]s and resolved
//! by whatever brings stock in later.
//!
//! [`FulfillmentEngine`] is the entry point; everything else is its vocabulary.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod events;
pub mod intervention;
pub mod movement;
pub mod outcome;
pub mod trigger;

mod resolver;
mod returns;
mod scheduler;
mod state;
mod supply;

pub use catalog::{Catalog, CatalogData, CatalogItem, InMemoryCatalog, VendorTerms};
pub use config::{EngineConfig, ProcessRoute};
pub use engine::{DropshipRequest, FulfillmentEngine};
pub use events::EngineEvent;
pub use intervention::{Intervention, InterventionId, InterventionStatus};
pub use movement::{Move, MoveId, MoveLine, MoveLineId, MoveRole, MoveStatus, SupplyRef};
pub use outcome::ResolutionOutcome;
pub use supply::{SupplyOwner, SupplyRecord};
pub use trigger::{OriginRef, Trigger, TriggerId, TriggerStatus};
