use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, ItemCode, PartyCode};

/// Where a shipment would leave from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShipFrom {
    Warehouse,
    Vendor(PartyCode),
}

/// Shipping-rate collaborator (carrier integrations live outside the engine).
pub trait ShippingRates {
    fn quote(
        &self,
        from: &ShipFrom,
        customer: &PartyCode,
        carrier: &PartyCode,
        item: &ItemCode,
        quantity: i64,
    ) -> DomainResult<Decimal>;
}

/// Base + per-unit pricing of one carrier.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CarrierRates {
    #[serde(default)]
    pub warehouse_base: Decimal,
    #[serde(default)]
    pub warehouse_per_unit: Decimal,
    #[serde(default)]
    pub vendor_base: Decimal,
    #[serde(default)]
    pub vendor_per_unit: Decimal,
}

/// Static per-carrier rate table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    carriers: HashMap<PartyCode, CarrierRates>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_carrier(mut self, carrier: impl Into<PartyCode>, rates: CarrierRates) -> Self {
        self.carriers.insert(carrier.into(), rates);
        self
    }
}

impl ShippingRates for RateTable {
    fn quote(
        &self,
        from: &ShipFrom,
        _customer: &PartyCode,
        carrier: &PartyCode,
        _item: &ItemCode,
        quantity: i64,
    ) -> DomainResult<Decimal> {
        let rates = self
            .carriers
            .get(carrier)
            .ok_or_else(|| DomainError::not_found(format!("shipping rates for carrier {carrier}")))?;
        let units = Decimal::from(quantity);
        Ok(match from {
            ShipFrom::Warehouse => rates.warehouse_base + rates.warehouse_per_unit * units,
            ShipFrom::Vendor(_) => rates.vendor_base + rates.vendor_per_unit * units,
        })
    }
}
