//! Integration events consumed from collaborators (order lifecycle, stock corrections,
//! operator confirmations).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wms_core::{AggregateId, ItemCode, LocationCode, LotCode, RouteCode, ZoneCode};

use crate::event::Event;

/// The business process an order belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginModel {
    SaleOrder,
    PurchaseOrder,
    ReturnOrder,
    TransferOrder,
    ManufacturingOrder,
}

impl OriginModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginModel::SaleOrder => "sale_order",
            OriginModel::PurchaseOrder => "purchase_order",
            OriginModel::ReturnOrder => "return_order",
            OriginModel::TransferOrder => "transfer_order",
            OriginModel::ManufacturingOrder => "manufacturing_order",
        }
    }
}

impl core::fmt::Display for OriginModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One demand/supply line of a confirmed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRef {
    pub line_no: u32,
    pub item: ItemCode,
    #[serde(default)]
    pub lot: Option<LotCode>,
    pub quantity: i64,
    /// Explicit destination (transfer orders); otherwise the process default applies.
    #[serde(default)]
    pub target_zone: Option<ZoneCode>,
    /// Explicit route (purchase lines may pick one); otherwise the process default applies.
    #[serde(default)]
    pub route: Option<RouteCode>,
}

impl OrderLineRef {
    pub fn new(line_no: u32, item: impl Into<ItemCode>, quantity: i64) -> Self {
        Self {
            line_no,
            item: item.into(),
            lot: None,
            quantity,
            target_zone: None,
            route: None,
        }
    }

    pub fn with_lot(mut self, lot: impl Into<LotCode>) -> Self {
        self.lot = Some(lot.into());
        self
    }

    pub fn with_target_zone(mut self, zone: impl Into<ZoneCode>) -> Self {
        self.target_zone = Some(zone.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<RouteCode>) -> Self {
        self.route = Some(route.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmed {
    pub origin_model: OriginModel,
    pub origin_id: AggregateId,
    pub lines: Vec<OrderLineRef>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub origin_model: OriginModel,
    pub origin_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Manual stock correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub item: ItemCode,
    pub location: LocationCode,
    #[serde(default)]
    pub lot: Option<LotCode>,
    pub delta: i64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Operator confirms physical completion of a picking/packing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveLineMarkDone {
    pub move_line_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationEvent {
    OrderConfirmed(OrderConfirmed),
    OrderCancelled(OrderCancelled),
    StockAdjustment(StockAdjustment),
    MoveLineMarkDone(MoveLineMarkDone),
}

impl Event for IntegrationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            IntegrationEvent::OrderConfirmed(_) => "integration.order.confirmed",
            IntegrationEvent::OrderCancelled(_) => "integration.order.cancelled",
            IntegrationEvent::StockAdjustment(_) => "integration.stock.adjustment",
            IntegrationEvent::MoveLineMarkDone(_) => "integration.move_line.done",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            IntegrationEvent::OrderConfirmed(e) => e.occurred_at,
            IntegrationEvent::OrderCancelled(e) => e.occurred_at,
            IntegrationEvent::StockAdjustment(e) => e.occurred_at,
            IntegrationEvent::MoveLineMarkDone(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_lines_deserialize_with_optional_fields_missing() {
        let line: OrderLineRef =
            serde_json::from_str(r#"{"line_no":1,"item":"SKU-1","quantity":4}"#).unwrap();
        assert_eq!(line, OrderLineRef::new(1, "SKU-1", 4));
    }

    #[test]
    fn origin_model_uses_snake_case_names() {
        let json = serde_json::to_string(&OriginModel::ReturnOrder).unwrap();
        assert_eq!(json, "\"return_order\"");
        assert_eq!(OriginModel::TransferOrder.to_string(), "transfer_order");
    }
}
