//! Integration event handling: order confirmations become triggers, cancellations
//! unwind their chains, stock corrections feed waiting moves.

use std::collections::HashSet;

use tracing::{debug, info};
use uuid::Uuid;

use wms_core::{AggregateId, DomainError, DomainResult, RouteCode, ZoneCode};
use wms_events::integration::{OrderCancelled, OrderConfirmed, OrderLineRef, OriginModel, StockAdjustment};
use wms_inventory::StockKey;
use wms_manufacturing::{ManufacturingOrderId, ManufacturingOrderStatus};
use wms_purchasing::{PurchaseOrderId, PurchaseOrderStatus};
use wms_returns::{ReturnOrderId, ReturnOrderStatus};

use crate::events::{EngineEvent, STOCK_STREAM};
use crate::scheduler::NewTrigger;
use crate::state::Ctx;
use crate::supply::SupplyOwner;
use crate::trigger::{OriginRef, TriggerId};

impl Ctx<'_> {
    /// Raises one trigger per order line at the line's destination zone and resolves it.
    /// Replaying a confirmation creates nothing new. Confirmations of generated purchase
    /// or manufacturing orders confirm that supply instead.
    pub(crate) fn order_confirmed(&mut self, event: &OrderConfirmed) -> DomainResult<()> {
        match event.origin_model {
            OriginModel::PurchaseOrder => {
                let id = PurchaseOrderId::new(event.origin_id);
                if let Some(po) = self.state.purchase_orders.get(&id) {
                    if po.status() == PurchaseOrderStatus::Confirmed {
                        debug!(purchase_order = %id, "purchase order already confirmed");
                        return Ok(());
                    }
                    return self.confirm_purchase_order(id);
                }
            }
            OriginModel::ManufacturingOrder => {
                let id = ManufacturingOrderId::new(event.origin_id);
                if let Some(mo) = self.state.manufacturing_orders.get(&id) {
                    if mo.status() != ManufacturingOrderStatus::Draft {
                        debug!(manufacturing_order = %id, status = ?mo.status(), "manufacturing order already confirmed");
                        return Ok(());
                    }
                    return self.confirm_manufacturing_order(id);
                }
            }
            _ => {}
        }

        if event.lines.is_empty() {
            return Err(DomainError::validation(format!(
                "{} {} has no lines",
                event.origin_model, event.origin_id
            )));
        }
        let mut seen = HashSet::new();
        for line in &event.lines {
            if !seen.insert(line.line_no) {
                return Err(DomainError::validation(format!(
                    "{} {} repeats line {}",
                    event.origin_model, event.origin_id, line.line_no
                )));
            }
            if line.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "line {} of {} {} has non-positive quantity {}",
                    line.line_no, event.origin_model, event.origin_id, line.quantity
                )));
            }
        }

        info!(
            origin = %event.origin_model,
            origin_id = %event.origin_id,
            lines = event.lines.len(),
            "order confirmed"
        );
        for line in &event.lines {
            let (route, target_zone) = self.process_for(event.origin_model, line)?;
            let origin = OriginRef {
                model: event.origin_model,
                id: event.origin_id,
                line_no: line.line_no,
            };
            let (trigger, created) = self.create_trigger(NewTrigger {
                origin,
                parent: None,
                item: line.item.clone(),
                lot: line.lot.clone(),
                quantity: line.quantity,
                target_zone,
                route,
            })?;
            if created {
                self.resolve_trigger(trigger)?;
            }
        }
        Ok(())
    }

    /// Route and destination of an order line: explicit values on the line win over the
    /// process defaults. Transfer lines must name their destination.
    fn process_for(&self, model: OriginModel, line: &OrderLineRef) -> DomainResult<(RouteCode, ZoneCode)> {
        let config = self.config;
        let (default_route, default_zone) = match model {
            OriginModel::SaleOrder => (config.sale.route.clone(), Some(config.sale.target_zone.clone())),
            OriginModel::PurchaseOrder => (
                config.purchase.route.clone(),
                Some(config.purchase.target_zone.clone()),
            ),
            OriginModel::ReturnOrder => (
                config.returns.route.clone(),
                Some(config.returns.target_zone.clone()),
            ),
            OriginModel::ManufacturingOrder => (
                config.manufacturing.route.clone(),
                Some(config.manufacturing.target_zone.clone()),
            ),
            OriginModel::TransferOrder => (config.transfer_route.clone(), None),
        };
        let route = line.route.clone().unwrap_or(default_route);
        let target = line.target_zone.clone().or(default_zone).ok_or_else(|| {
            DomainError::validation(format!("transfer line {} needs a target zone", line.line_no))
        })?;

        if self.graph.route(&route).is_none() {
            return Err(DomainError::configuration(format!("unknown route {route}")));
        }
        if !self.graph.has_zone(&target) {
            return Err(DomainError::configuration(format!("unknown zone {target}")));
        }
        Ok((route, target))
    }

    /// Cancels everything still pending for an order and gives back the draft supply it
    /// generated. Completed moves stay as they are.
    pub(crate) fn order_cancelled(&mut self, event: &OrderCancelled) -> DomainResult<()> {
        match event.origin_model {
            OriginModel::PurchaseOrder => {
                let id = PurchaseOrderId::new(event.origin_id);
                if let Some(po) = self.state.purchase_orders.get(&id) {
                    if po.status() == PurchaseOrderStatus::Cancelled {
                        return Ok(());
                    }
                    return self.cancel_purchase_order(id);
                }
            }
            OriginModel::ManufacturingOrder => {
                let id = ManufacturingOrderId::new(event.origin_id);
                if let Some(mo) = self.state.manufacturing_orders.get(&id) {
                    if matches!(
                        mo.status(),
                        ManufacturingOrderStatus::Cancelled | ManufacturingOrderStatus::Done
                    ) {
                        return Ok(());
                    }
                    return self.cancel_manufacturing_order(id);
                }
            }
            OriginModel::ReturnOrder => {
                let id = ReturnOrderId::new(event.origin_id);
                let cancellable = self.state.returns.get(id).is_some_and(|r| {
                    matches!(r.status(), ReturnOrderStatus::Draft | ReturnOrderStatus::Confirmed)
                });
                if cancellable {
                    self.state.returns.cancel(id)?;
                    self.return_changed(id)?;
                }
            }
            _ => {}
        }
        self.cancel_origin(event.origin_model, event.origin_id)
    }

    pub(crate) fn cancel_origin(&mut self, model: OriginModel, id: AggregateId) -> DomainResult<()> {
        let mut pending: Vec<(u64, TriggerId)> = self
            .state
            .triggers
            .values()
            .filter(|t| t.origin.model == model && t.origin.id == id && t.is_pending())
            .map(|t| (t.sequence, t.id))
            .collect();
        if pending.is_empty() {
            debug!(origin = %model, origin_id = %id, "nothing pending to cancel");
            return Ok(());
        }
        pending.sort();
        info!(origin = %model, origin_id = %id, triggers = pending.len(), "cancelling order chain");
        for (_, trigger) in &pending {
            self.cancel_trigger(*trigger)?;
        }
        for (_, trigger) in pending {
            self.shrink_supply(SupplyOwner::Trigger(trigger))?;
        }
        Ok(())
    }

    /// Applies a manual stock correction; increases re-evaluate moves waiting on the
    /// location.
    pub(crate) fn adjust_stock(&mut self, adjustment: &StockAdjustment) -> DomainResult<()> {
        if self.graph.location(&adjustment.location).is_none() {
            return Err(DomainError::validation(format!(
                "unknown location {}",
                adjustment.location
            )));
        }
        let key = StockKey::new(
            adjustment.item.clone(),
            adjustment.location.clone(),
            adjustment.lot.clone(),
        );
        let level = self.tx.adjust(&key, adjustment.delta)?;
        info!(
            stock = %key,
            delta = adjustment.delta,
            on_hand = level.on_hand,
            reason = %adjustment.reason,
            "stock adjusted"
        );
        self.emit(
            STOCK_STREAM,
            Uuid::new_v5(&Uuid::NAMESPACE_OID, key.to_string().as_bytes()),
            EngineEvent::StockAdjusted {
                item: adjustment.item.clone(),
                location: adjustment.location.clone(),
                lot: adjustment.lot.clone(),
                delta: adjustment.delta,
                reason: adjustment.reason.clone(),
                occurred_at: self.now,
            },
        );
        if adjustment.delta > 0 {
            self.reevaluate(&adjustment.item, &adjustment.location)?;
        }
        Ok(())
    }
}
