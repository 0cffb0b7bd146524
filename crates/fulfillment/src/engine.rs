//! Engine facade: one lock per top-level operation, transactional state and stock.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use wms_core::{AggregateId, DomainError, DomainResult, ItemCode, LocationCode, PartyCode};
use wms_dropshipping::{DropshipDecision, DropshipInputs, DropshippingDesk, ShipFrom, ShippingRates};
use wms_events::integration::{IntegrationEvent, OrderCancelled, OrderConfirmed, OriginModel, StockAdjustment};
use wms_events::{EventEnvelope, EventLog, InMemoryEventBus};
use wms_inventory::{LedgerTx, StockKey, StockLedger, StockLevel};
use wms_manufacturing::{ManufacturingOrder, ManufacturingOrderId};
use wms_purchasing::{PurchaseOrder, PurchaseOrderId};
use wms_returns::{OriginOrder, ReturnOrder, ReturnOrderId, ReturnRequestLine};
use wms_routing::{RuleGraph, Topology};

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::events::{DROPSHIP_STREAM, EngineEvent, TOPOLOGY_STREAM};
use crate::intervention::Intervention;
use crate::movement::{Move, MoveId, MoveLine, MoveLineId};
use crate::outcome::ResolutionOutcome;
use crate::state::{Ctx, EngineState};
use crate::trigger::{Trigger, TriggerId};

/// One dropship question as asked by the sales side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropshipRequest {
    pub request_id: String,
    pub item: ItemCode,
    pub customer: PartyCode,
    pub carrier: PartyCode,
    pub ordered_quantity: i64,
}

/// The fulfillment resolution engine.
///
/// Every mutating operation runs under the engine lock against a copy of the state and
/// a journaled ledger transaction. Errors leave both untouched; success swaps the copy
/// in, commits the ledger and appends the operation's events to the log.
pub struct FulfillmentEngine {
    config: EngineConfig,
    graph: RwLock<Arc<RuleGraph>>,
    catalog: Arc<dyn Catalog>,
    ledger: Arc<StockLedger>,
    state: Mutex<EngineState>,
    desk: Mutex<DropshippingDesk>,
    log: EventLog<EngineEvent>,
}

impl FulfillmentEngine {
    pub fn new(config: EngineConfig, graph: RuleGraph, catalog: Arc<dyn Catalog>) -> DomainResult<Self> {
        config.validate_against(&graph)?;
        let ledger = Arc::new(StockLedger::with_retry_policy(config.retry_policy()));
        info!(
            topology_version = graph.version(),
            rules = graph.rules().len(),
            "fulfillment engine ready"
        );
        Ok(Self {
            config,
            graph: RwLock::new(Arc::new(graph)),
            catalog,
            ledger,
            state: Mutex::new(EngineState::default()),
            desk: Mutex::new(DropshippingDesk::new()),
            log: EventLog::new(),
        })
    }

    /// Publishes every appended event on `bus` as well.
    pub fn with_event_bus(mut self, bus: Arc<InMemoryEventBus<EventEnvelope<EngineEvent>>>) -> Self {
        self.log = EventLog::with_bus(bus);
        self
    }

    /// Shares a stock ledger with other components.
    pub fn with_ledger(mut self, ledger: Arc<StockLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    // State is only ever replaced wholesale, so a poisoned lock still guards a
    // consistent snapshot.
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transact<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Ctx<'_>) -> DomainResult<T>,
    ) -> DomainResult<(T, ResolutionOutcome)> {
        let graph = self.graph();
        let mut state = self.lock_state();
        let mut working = state.clone();

        let mut ctx = Ctx::new(
            &graph,
            self.catalog.as_ref(),
            &self.config,
            &mut working,
            LedgerTx::begin(&self.ledger),
            Utc::now(),
        );
        let value = match f(&mut ctx).and_then(|value| ctx.reoffer_released().map(|()| value)) {
            Ok(value) => value,
            Err(err) => {
                drop(ctx);
                warn!(op, error = %err, "operation rolled back");
                return Err(err);
            }
        };
        let (tx, events) = ctx.finish();
        tx.commit();
        *state = working;

        let outcome = ResolutionOutcome::from_events(&events);
        self.log.append_all(events);
        Ok((value, outcome))
    }

    fn run(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Ctx<'_>) -> DomainResult<()>,
    ) -> DomainResult<ResolutionOutcome> {
        self.transact(op, f).map(|((), outcome)| outcome)
    }

    /// Dispatches a collaborator event.
    pub fn handle(&self, event: &IntegrationEvent) -> DomainResult<ResolutionOutcome> {
        match event {
            IntegrationEvent::OrderConfirmed(e) => self.on_order_confirmed(e),
            IntegrationEvent::OrderCancelled(e) => self.on_order_cancelled(e),
            IntegrationEvent::StockAdjustment(e) => self.adjust_stock(e),
            IntegrationEvent::MoveLineMarkDone(e) => self.mark_move_line_done(MoveLineId::from(e.move_line_id)),
        }
    }

    pub fn on_order_confirmed(&self, event: &OrderConfirmed) -> DomainResult<ResolutionOutcome> {
        self.run("order_confirmed", |ctx| ctx.order_confirmed(event))
    }

    pub fn on_order_cancelled(&self, event: &OrderCancelled) -> DomainResult<ResolutionOutcome> {
        self.run("order_cancelled", |ctx| ctx.order_cancelled(event))
    }

    pub fn adjust_stock(&self, adjustment: &StockAdjustment) -> DomainResult<ResolutionOutcome> {
        self.run("adjust_stock", |ctx| ctx.adjust_stock(adjustment))
    }

    /// Completes whatever is left on a move line.
    pub fn mark_move_line_done(&self, line: MoveLineId) -> DomainResult<ResolutionOutcome> {
        self.run("mark_move_line_done", |ctx| ctx.progress_line(line, None))
    }

    /// Records a partial completion of `quantity` units on a move line.
    pub fn record_move_line_progress(&self, line: MoveLineId, quantity: i64) -> DomainResult<ResolutionOutcome> {
        self.run("record_move_line_progress", |ctx| ctx.progress_line(line, Some(quantity)))
    }

    /// Retries a pending trigger (and its upstream chain).
    pub fn resolve_trigger(&self, trigger: TriggerId) -> DomainResult<ResolutionOutcome> {
        self.run("resolve_trigger", |ctx| ctx.resolve_trigger(trigger))
    }

    pub fn confirm_purchase_order(&self, id: PurchaseOrderId) -> DomainResult<ResolutionOutcome> {
        self.run("confirm_purchase_order", |ctx| {
            ensure_known(ctx.state.purchase_orders.contains_key(&id), "purchase order", id)?;
            ctx.confirm_purchase_order(id)
        })
    }

    pub fn cancel_purchase_order(&self, id: PurchaseOrderId) -> DomainResult<ResolutionOutcome> {
        self.run("cancel_purchase_order", |ctx| {
            ensure_known(ctx.state.purchase_orders.contains_key(&id), "purchase order", id)?;
            ctx.cancel_purchase_order(id)
        })
    }

    /// Opens a draft manufacturing order for an item with a BOM.
    pub fn create_manufacturing_order(
        &self,
        item: impl Into<ItemCode>,
        quantity: i64,
    ) -> DomainResult<(ManufacturingOrderId, ResolutionOutcome)> {
        let item = item.into();
        self.transact("create_manufacturing_order", |ctx| {
            let catalog = ctx.catalog;
            let bom = catalog
                .bom(&item)
                .ok_or_else(|| DomainError::validation(format!("item {item} has no BOM")))?;
            bom.validate()?;
            ctx.create_manufacturing_order(item.clone(), quantity, None)
        })
    }

    pub fn confirm_manufacturing_order(&self, id: ManufacturingOrderId) -> DomainResult<ResolutionOutcome> {
        self.run("confirm_manufacturing_order", |ctx| {
            ensure_known(ctx.state.manufacturing_orders.contains_key(&id), "manufacturing order", id)?;
            ctx.confirm_manufacturing_order(id)
        })
    }

    pub fn complete_manufacturing_order(&self, id: ManufacturingOrderId) -> DomainResult<ResolutionOutcome> {
        self.run("complete_manufacturing_order", |ctx| ctx.complete_manufacturing_order(id))
    }

    pub fn cancel_manufacturing_order(&self, id: ManufacturingOrderId) -> DomainResult<ResolutionOutcome> {
        self.run("cancel_manufacturing_order", |ctx| {
            ensure_known(ctx.state.manufacturing_orders.contains_key(&id), "manufacturing order", id)?;
            ctx.cancel_manufacturing_order(id)
        })
    }

    /// Validates, prices and records a draft return against its origin order.
    pub fn create_return(
        &self,
        origin: &OriginOrder,
        lines: &[ReturnRequestLine],
    ) -> DomainResult<ReturnOrderId> {
        let id = ReturnOrderId::new(AggregateId::new());
        self.transact("create_return", |ctx| ctx.create_return(id, origin, lines))?;
        Ok(id)
    }

    /// Confirms a return; its lines are routed back in through the returns process.
    pub fn confirm_return(&self, id: ReturnOrderId) -> DomainResult<ResolutionOutcome> {
        self.run("confirm_return", |ctx| ctx.confirm_return(id))
    }

    pub fn complete_return(&self, id: ReturnOrderId) -> DomainResult<ResolutionOutcome> {
        self.run("complete_return", |ctx| ctx.complete_return(id))
    }

    pub fn cancel_return(&self, id: ReturnOrderId) -> DomainResult<ResolutionOutcome> {
        self.run("cancel_return", |ctx| ctx.cancel_return(id))
    }

    /// Swaps in a new validated topology between operations. Returns its version.
    pub fn reload_topology(&self, topology: Topology) -> DomainResult<u64> {
        let state = self.lock_state();
        let current = self.graph();
        let next = RuleGraph::load_versioned(topology, current.version() + 1)?;
        self.config.validate_against(&next)?;
        for mv in state.moves.values().filter(|m| !m.status.is_terminal()) {
            for zone in [&mv.source_zone, &mv.target_zone] {
                if !next.has_zone(zone) {
                    return Err(DomainError::configuration(format!(
                        "zone {zone} is still used by move {}",
                        mv.id
                    )));
                }
            }
        }

        let version = next.version();
        *self.graph.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        self.log.append(
            TOPOLOGY_STREAM,
            Uuid::nil(),
            EngineEvent::TopologyReloaded {
                version,
                occurred_at: Utc::now(),
            },
        );
        info!(version, "topology reloaded");
        drop(state);
        Ok(version)
    }

    /// Answers a dropship question from catalog terms, warehouse stock and carrier
    /// quotes. The same request id always gets the same answer.
    pub fn dropship_decision(
        &self,
        request: &DropshipRequest,
        rates: &dyn ShippingRates,
    ) -> DomainResult<DropshipDecision> {
        let mut desk = self.desk.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = desk.record(&request.request_id) {
            let inputs = &record.inputs;
            let same = inputs.item == request.item
                && inputs.customer == request.customer
                && inputs.carrier == request.carrier
                && inputs.ordered_quantity == request.ordered_quantity;
            if !same {
                return Err(DomainError::conflict(format!(
                    "dropship request {} was already answered for different inputs",
                    request.request_id
                )));
            }
            return Ok(record.decision);
        }

        let vendor = self.catalog.vendor_of(&request.item).cloned().ok_or_else(|| {
            DomainError::validation(format!("item {} has no vendor", request.item))
        })?;
        let quote = |from: &ShipFrom| {
            rates.quote(
                from,
                &request.customer,
                &request.carrier,
                &request.item,
                request.ordered_quantity,
            )
        };
        let inputs = DropshipInputs {
            item: request.item.clone(),
            vendor: vendor.clone(),
            customer: request.customer.clone(),
            carrier: request.carrier.clone(),
            ordered_quantity: request.ordered_quantity,
            vendor_accepts_dropship: self.catalog.accepts_dropship(&vendor),
            warehouse_stock: self.warehouse_stock(&request.item),
            vendor_stock: self.catalog.vendor_stock(&vendor, &request.item),
            shipping_cost_vendor_to_customer: quote(&ShipFrom::Vendor(vendor.clone()))?,
            shipping_cost_warehouse_to_customer: quote(&ShipFrom::Warehouse)?,
        };
        let decision = desk.decide(&request.request_id, inputs, Utc::now())?;
        self.log.append(
            DROPSHIP_STREAM,
            Uuid::new_v5(&Uuid::NAMESPACE_OID, request.request_id.as_bytes()),
            EngineEvent::DropshipDecided {
                request_id: request.request_id.clone(),
                item: request.item.clone(),
                decision,
                occurred_at: Utc::now(),
            },
        );
        Ok(decision)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> Arc<RuleGraph> {
        self.graph
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn ledger(&self) -> &Arc<StockLedger> {
        &self.ledger
    }

    pub fn trigger(&self, id: TriggerId) -> Option<Trigger> {
        self.lock_state().triggers.get(&id).cloned()
    }

    /// Triggers in creation order.
    pub fn triggers(&self) -> Vec<Trigger> {
        let mut out: Vec<Trigger> = self.lock_state().triggers.values().cloned().collect();
        out.sort_by_key(|t| t.sequence);
        out
    }

    pub fn triggers_for(&self, model: OriginModel, origin_id: AggregateId) -> Vec<Trigger> {
        self.triggers()
            .into_iter()
            .filter(|t| t.origin.model == model && t.origin.id == origin_id)
            .collect()
    }

    pub fn move_by_id(&self, id: MoveId) -> Option<Move> {
        self.lock_state().moves.get(&id).cloned()
    }

    /// Moves in trigger order.
    pub fn moves(&self) -> Vec<Move> {
        let mut out: Vec<Move> = self.lock_state().moves.values().cloned().collect();
        out.sort_by_key(|m| (m.sequence, m.created_at));
        out
    }

    pub fn moves_of(&self, trigger: TriggerId) -> Vec<Move> {
        self.moves()
            .into_iter()
            .filter(|m| m.trigger == Some(trigger))
            .collect()
    }

    pub fn move_line(&self, id: MoveLineId) -> Option<MoveLine> {
        self.lock_state().move_lines.get(&id).cloned()
    }

    pub fn move_lines_of(&self, move_id: MoveId) -> Vec<MoveLine> {
        let state = self.lock_state();
        state
            .moves
            .get(&move_id)
            .map(|m| {
                m.lines
                    .iter()
                    .filter_map(|id| state.move_lines.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn interventions(&self) -> Vec<Intervention> {
        let mut out: Vec<Intervention> = self.lock_state().interventions.values().cloned().collect();
        out.sort_by_key(|i| (i.sequence, i.opened_at));
        out
    }

    /// Open interventions, oldest demand first.
    pub fn open_interventions(&self) -> Vec<Intervention> {
        self.interventions()
            .into_iter()
            .filter(Intervention::is_open)
            .collect()
    }

    pub fn purchase_order(&self, id: PurchaseOrderId) -> Option<PurchaseOrder> {
        self.lock_state().purchase_orders.get(&id).cloned()
    }

    pub fn purchase_orders(&self) -> Vec<PurchaseOrder> {
        self.lock_state().purchase_orders.values().cloned().collect()
    }

    pub fn manufacturing_order(&self, id: ManufacturingOrderId) -> Option<ManufacturingOrder> {
        self.lock_state().manufacturing_orders.get(&id).cloned()
    }

    pub fn manufacturing_orders(&self) -> Vec<ManufacturingOrder> {
        self.lock_state().manufacturing_orders.values().cloned().collect()
    }

    pub fn return_order(&self, id: ReturnOrderId) -> Option<ReturnOrder> {
        self.lock_state().returns.get(id).cloned()
    }

    pub fn return_orders(&self) -> Vec<ReturnOrder> {
        self.lock_state().returns.orders().cloned().collect()
    }

    /// Every non-empty stock cell of an item.
    pub fn item_stock(&self, item: &ItemCode) -> Vec<(StockKey, StockLevel)> {
        self.ledger.cells_for_item(item)
    }

    /// Available quantity of an item inside the warehouse (vendor and customer zones
    /// excluded).
    pub fn warehouse_stock(&self, item: &ItemCode) -> i64 {
        let graph = self.graph();
        self.ledger
            .cells_for_item(item)
            .into_iter()
            .filter(|(key, _)| {
                !graph
                    .zones_of(&key.location)
                    .iter()
                    .any(|z| self.config.is_external(z))
            })
            .map(|(_, level)| level.available())
            .sum()
    }

    /// Locations holding no stock at all.
    pub fn empty_locations(&self) -> Vec<LocationCode> {
        let occupied: BTreeSet<LocationCode> = self
            .ledger
            .snapshot()
            .into_iter()
            .filter(|(_, level)| level.on_hand > 0)
            .map(|(key, _)| key.location)
            .collect();
        let mut out: Vec<LocationCode> = self
            .graph()
            .locations()
            .map(|l| l.code.clone())
            .filter(|code| !occupied.contains(code))
            .collect();
        out.sort();
        out
    }

    pub fn events(&self) -> Vec<EventEnvelope<EngineEvent>> {
        self.log.entries()
    }

    pub fn events_since(&self, sequence: u64) -> Vec<EventEnvelope<EngineEvent>> {
        self.log.since(sequence)
    }

    /// Forgets logged events numbered below `sequence`, once a consumer has stored them.
    pub fn truncate_events_before(&self, sequence: u64) -> usize {
        self.log.truncate_before(sequence)
    }
}

fn ensure_known(known: bool, what: &str, id: impl core::fmt::Display) -> DomainResult<()> {
    if known {
        Ok(())
    } else {
        Err(DomainError::not_found(format!("{what} {id}")))
    }
}
