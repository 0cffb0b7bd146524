//! Engine working state and the per-operation context.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use wms_core::{DomainError, DomainResult, ItemCode, LocationCode, PartyCode, ZoneCode};
use wms_inventory::LedgerTx;
use wms_manufacturing::{ManufacturingOrder, ManufacturingOrderId};
use wms_purchasing::{PurchaseOrder, PurchaseOrderId, PurchaseOrderStatus};
use wms_returns::ReturnRegistry;
use wms_routing::RuleGraph;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::events::{EngineEvent, MOVE_STREAM};
use crate::intervention::{Intervention, InterventionId};
use crate::movement::{Move, MoveId, MoveLine, MoveLineId, MoveRole, MoveStatus};
use crate::supply::{SupplyOwner, SupplyRecord};
use crate::trigger::{OriginRef, Trigger, TriggerId};

/// Everything the engine owns besides stock.
///
/// Operations work on a clone and swap it in on success, so a failed operation leaves
/// no partial graph behind.
#[derive(Debug, Clone, Default)]
pub(crate) struct EngineState {
    pub triggers: BTreeMap<TriggerId, Trigger>,
    pub trigger_index: HashMap<(OriginRef, ZoneCode), TriggerId>,
    pub moves: BTreeMap<MoveId, Move>,
    pub move_lines: BTreeMap<MoveLineId, MoveLine>,
    pub interventions: BTreeMap<InterventionId, Intervention>,
    pub purchase_orders: BTreeMap<PurchaseOrderId, PurchaseOrder>,
    pub manufacturing_orders: BTreeMap<ManufacturingOrderId, ManufacturingOrder>,
    pub supply: Vec<SupplyRecord>,
    pub exploded: HashSet<ManufacturingOrderId>,
    pub returns: ReturnRegistry,
    sequence: u64,
}

impl EngineState {
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub fn demand_move(&self, trigger: TriggerId) -> Option<MoveId> {
        self.moves
            .values()
            .find(|m| m.trigger == Some(trigger) && m.role == MoveRole::Demand)
            .map(|m| m.id)
    }

    pub fn moves_of(&self, trigger: TriggerId) -> Vec<MoveId> {
        self.moves
            .values()
            .filter(|m| m.trigger == Some(trigger))
            .map(|m| m.id)
            .collect()
    }

    pub fn children_of(&self, trigger: TriggerId) -> Vec<TriggerId> {
        self.triggers
            .values()
            .filter(|t| t.parent == Some(trigger))
            .map(|t| t.id)
            .collect()
    }

    pub fn open_interventions_of(&self, move_id: MoveId) -> Vec<InterventionId> {
        self.interventions
            .values()
            .filter(|i| i.move_id == move_id && i.is_open())
            .map(|i| i.id)
            .collect()
    }

    /// Quantity already covered by lines of the move.
    pub fn lined_quantity(&self, move_id: MoveId) -> i64 {
        self.move_lines
            .values()
            .filter(|l| l.move_id == move_id)
            .map(|l| l.quantity)
            .sum()
    }

    pub fn supply_for(&self, owner: &SupplyOwner, item: &ItemCode) -> Option<&SupplyRecord> {
        self.supply
            .iter()
            .find(|r| &r.owner == owner && &r.item == item)
    }

    /// Oldest draft purchase order of a vendor, if one is still open for new lines.
    pub fn draft_purchase_order_for(&self, vendor: &PartyCode) -> Option<PurchaseOrderId> {
        self.purchase_orders
            .values()
            .filter(|po| po.status() == PurchaseOrderStatus::Draft && po.vendor() == Some(vendor))
            .min_by_key(|po| po.created_at())
            .map(|po| po.id_typed())
    }

    /// Target zones of a trigger and all of its ancestors.
    pub fn chain_zones(&self, trigger: TriggerId) -> Vec<ZoneCode> {
        let mut zones = Vec::new();
        let mut cursor = self.triggers.get(&trigger);
        while let Some(t) = cursor {
            zones.push(t.target_zone.clone());
            cursor = t.parent.and_then(|p| self.triggers.get(&p));
        }
        zones
    }
}

/// One engine operation in flight: the working state, a journaled ledger transaction
/// and the events to append when it commits.
pub(crate) struct Ctx<'a> {
    pub graph: &'a RuleGraph,
    pub catalog: &'a dyn Catalog,
    pub config: &'a EngineConfig,
    pub state: &'a mut EngineState,
    pub tx: LedgerTx<'a>,
    pub now: DateTime<Utc>,
    /// Cells whose reservations were given back; re-offered before the operation commits.
    pub released: Vec<(ItemCode, LocationCode)>,
    events: Vec<(&'static str, Uuid, EngineEvent)>,
}

impl<'a> Ctx<'a> {
    pub fn new(
        graph: &'a RuleGraph,
        catalog: &'a dyn Catalog,
        config: &'a EngineConfig,
        state: &'a mut EngineState,
        tx: LedgerTx<'a>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            graph,
            catalog,
            config,
            state,
            tx,
            now,
            released: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn finish(self) -> (LedgerTx<'a>, Vec<(&'static str, Uuid, EngineEvent)>) {
        (self.tx, self.events)
    }

    pub fn emit(&mut self, stream: &'static str, entity: impl Into<Uuid>, event: EngineEvent) {
        self.events.push((stream, entity.into(), event));
    }

    pub fn move_ref(&self, id: MoveId) -> DomainResult<&Move> {
        self.state
            .moves
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("move {id}")))
    }

    /// Applies a legal status change and records it; a no-op when already there.
    pub fn set_move_status(&mut self, id: MoveId, to: MoveStatus) -> DomainResult<()> {
        let now = self.now;
        let mv = self
            .state
            .moves
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("move {id}")))?;
        if mv.status == to {
            return Ok(());
        }
        let from = mv.transition(to, now)?;
        debug!(move_id = %id, %from, %to, "move status changed");
        self.emit(
            MOVE_STREAM,
            id,
            EngineEvent::MoveStatusChanged {
                move_id: id,
                from,
                to,
                occurred_at: now,
            },
        );
        Ok(())
    }
}
