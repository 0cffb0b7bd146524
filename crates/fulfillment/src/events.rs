//! Engine event log payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wms_core::{ItemCode, LocationCode, LotCode, RouteCode, ZoneCode};
use wms_dropshipping::DropshipDecision;
use wms_events::Event;
use wms_manufacturing::ManufacturingOrderEvent;
use wms_purchasing::PurchaseOrderEvent;
use wms_returns::{ReturnOrderId, ReturnOrderStatus};
use wms_routing::Action;

use crate::intervention::InterventionId;
use crate::movement::{MoveId, MoveLineId, MoveRole, MoveStatus, SupplyRef};
use crate::trigger::{OriginRef, TriggerId};

pub(crate) const TRIGGER_STREAM: &str = "fulfillment.trigger";
pub(crate) const MOVE_STREAM: &str = "fulfillment.move";
pub(crate) const INTERVENTION_STREAM: &str = "fulfillment.intervention";
pub(crate) const PURCHASE_STREAM: &str = "purchasing.order";
pub(crate) const MANUFACTURING_STREAM: &str = "manufacturing.order";
pub(crate) const STOCK_STREAM: &str = "inventory.stock";
pub(crate) const RETURN_STREAM: &str = "returns.order";
pub(crate) const TOPOLOGY_STREAM: &str = "routing.topology";
pub(crate) const DROPSHIP_STREAM: &str = "dropshipping.decision";

/// Everything the engine decided, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EngineEvent {
    TriggerCreated {
        trigger_id: TriggerId,
        sequence: u64,
        origin: OriginRef,
        parent: Option<TriggerId>,
        item: ItemCode,
        lot: Option<LotCode>,
        quantity: i64,
        target_zone: ZoneCode,
        route: RouteCode,
        occurred_at: DateTime<Utc>,
    },
    TriggerResolved {
        trigger_id: TriggerId,
        occurred_at: DateTime<Utc>,
    },
    TriggerCancelled {
        trigger_id: TriggerId,
        occurred_at: DateTime<Utc>,
    },
    MoveCreated {
        move_id: MoveId,
        trigger_id: Option<TriggerId>,
        rule: Option<String>,
        action: Action,
        role: MoveRole,
        item: ItemCode,
        quantity: i64,
        source_zone: ZoneCode,
        target_zone: ZoneCode,
        occurred_at: DateTime<Utc>,
    },
    MoveStatusChanged {
        move_id: MoveId,
        from: MoveStatus,
        to: MoveStatus,
        occurred_at: DateTime<Utc>,
    },
    MoveLineReserved {
        move_line_id: MoveLineId,
        move_id: MoveId,
        source_location: LocationCode,
        lot: Option<LotCode>,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    },
    MoveLineProgressed {
        move_line_id: MoveLineId,
        move_id: MoveId,
        delta: i64,
        done_quantity: i64,
        occurred_at: DateTime<Utc>,
    },
    InterventionOpened {
        intervention_id: InterventionId,
        move_id: MoveId,
        item: ItemCode,
        zone: ZoneCode,
        shortfall: i64,
        occurred_at: DateTime<Utc>,
    },
    InterventionResolved {
        intervention_id: InterventionId,
        move_id: MoveId,
        occurred_at: DateTime<Utc>,
    },
    InterventionCancelled {
        intervention_id: InterventionId,
        move_id: MoveId,
        occurred_at: DateTime<Utc>,
    },
    SupplyGenerated {
        trigger_id: Option<TriggerId>,
        order: SupplyRef,
        item: ItemCode,
        lot: Option<LotCode>,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    },
    PurchaseOrder(PurchaseOrderEvent),
    ManufacturingOrder(ManufacturingOrderEvent),
    StockAdjusted {
        item: ItemCode,
        location: LocationCode,
        lot: Option<LotCode>,
        delta: i64,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
    ReturnOrderChanged {
        return_order_id: ReturnOrderId,
        code: String,
        status: ReturnOrderStatus,
        refund_total: Decimal,
        occurred_at: DateTime<Utc>,
    },
    TopologyReloaded {
        version: u64,
        occurred_at: DateTime<Utc>,
    },
    DropshipDecided {
        request_id: String,
        item: ItemCode,
        decision: DropshipDecision,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for EngineEvent {
    fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::TriggerCreated { .. } => "fulfillment.trigger.created",
            EngineEvent::TriggerResolved { .. } => "fulfillment.trigger.resolved",
            EngineEvent::TriggerCancelled { .. } => "fulfillment.trigger.cancelled",
            EngineEvent::MoveCreated { .. } => "fulfillment.move.created",
            EngineEvent::MoveStatusChanged { .. } => "fulfillment.move.status_changed",
            EngineEvent::MoveLineReserved { .. } => "fulfillment.move_line.reserved",
            EngineEvent::MoveLineProgressed { .. } => "fulfillment.move_line.progressed",
            EngineEvent::InterventionOpened { .. } => "fulfillment.intervention.opened",
            EngineEvent::InterventionResolved { .. } => "fulfillment.intervention.resolved",
            EngineEvent::InterventionCancelled { .. } => "fulfillment.intervention.cancelled",
            EngineEvent::SupplyGenerated { .. } => "fulfillment.supply.generated",
            EngineEvent::PurchaseOrder(e) => e.event_type(),
            EngineEvent::ManufacturingOrder(e) => e.event_type(),
            EngineEvent::StockAdjusted { .. } => "inventory.stock.adjusted",
            EngineEvent::ReturnOrderChanged { .. } => "returns.order.changed",
            EngineEvent::TopologyReloaded { .. } => "routing.topology.reloaded",
            EngineEvent::DropshipDecided { .. } => "dropshipping.decision.recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            EngineEvent::PurchaseOrder(e) => e.occurred_at(),
            EngineEvent::ManufacturingOrder(e) => e.occurred_at(),
            EngineEvent::TriggerCreated { occurred_at, .. }
            | EngineEvent::TriggerResolved { occurred_at, .. }
            | EngineEvent::TriggerCancelled { occurred_at, .. }
            | EngineEvent::MoveCreated { occurred_at, .. }
            | EngineEvent::MoveStatusChanged { occurred_at, .. }
            | EngineEvent::MoveLineReserved { occurred_at, .. }
            | EngineEvent::MoveLineProgressed { occurred_at, .. }
            | EngineEvent::InterventionOpened { occurred_at, .. }
            | EngineEvent::InterventionResolved { occurred_at, .. }
            | EngineEvent::InterventionCancelled { occurred_at, .. }
            | EngineEvent::SupplyGenerated { occurred_at, .. }
            | EngineEvent::StockAdjusted { occurred_at, .. }
            | EngineEvent::ReturnOrderChanged { occurred_at, .. }
            | EngineEvent::TopologyReloaded { occurred_at, .. }
            | EngineEvent::DropshipDecided { occurred_at, .. } => *occurred_at,
        }
    }
}
