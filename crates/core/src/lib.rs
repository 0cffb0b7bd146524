//! `wms-core`: ids, errors and aggregate traits shared by every domain crate.
//!
//! This crate contains **pure domain** primitives shared by every warehouse crate
//! (identifiers, the error taxonomy, aggregate traits). No infrastructure concerns.

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DomainError, DomainResult, ErrorClass};
pub use id::{AggregateId, ItemCode, LocationCode, LotCode, PartyCode, RouteCode, ZoneCode};
