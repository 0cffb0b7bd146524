//! Supply generation: purchase and manufacturing orders spawned for shortfalls,
//! BOM explosion and manufacturing completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use wms_core::{AggregateId, DomainError, DomainResult, ItemCode, LotCode, PartyCode, ZoneCode};
use wms_events::execute;
use wms_inventory::StockKey;
use wms_manufacturing::{
    CancelManufacturingOrder, CompleteManufacturingOrder, ComponentRequirement,
    ConfirmManufacturingOrder, CreateManufacturingOrder, ManufacturingOrder,
    ManufacturingOrderCommand, ManufacturingOrderId, ManufacturingOrderStatus,
};
use wms_purchasing::{
    AddLine, CancelPurchaseOrder, ConfirmPurchaseOrder, CreatePurchaseOrder, PurchaseOrder,
    PurchaseOrderCommand, PurchaseOrderId, PurchaseOrderStatus, ReduceLine,
};
use wms_routing::Action;

use crate::events::{EngineEvent, MANUFACTURING_STREAM, PURCHASE_STREAM, TRIGGER_STREAM};
use crate::movement::{MoveId, MoveRole, MoveStatus, SupplyRef};
use crate::scheduler::NewMove;
use crate::state::Ctx;
use crate::trigger::TriggerId;

/// What a piece of generated supply was generated for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyOwner {
    /// Shortfall of a trigger.
    Trigger(TriggerId),
    /// Component demand of a confirmed manufacturing order.
    Explosion(ManufacturingOrderId),
}

/// Ledger of generated supply; makes generation idempotent and lets cancellation shrink it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyRecord {
    pub owner: SupplyOwner,
    pub order: SupplyRef,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl Ctx<'_> {
    /// Covers a shortfall of `item` for `trigger` with a manufacturing order (item has a
    /// BOM) or a line on the vendor's draft purchase order. At most once per
    /// `(trigger, item)`.
    pub(crate) fn supply_shortfall(
        &mut self,
        trigger: TriggerId,
        item: &ItemCode,
        lot: Option<&LotCode>,
        quantity: i64,
    ) -> DomainResult<SupplyRef> {
        let owner = SupplyOwner::Trigger(trigger);
        if let Some(existing) = self.state.supply_for(&owner, item) {
            debug!(trigger = %trigger, item = %item, order = %existing.order, "supply already generated");
            return Ok(existing.order);
        }

        let catalog = self.catalog;
        let order = match catalog.bom(item) {
            Some(bom) => {
                bom.validate()?;
                let id = self.create_manufacturing_order(item.clone(), quantity, None)?;
                SupplyRef::Manufacturing(id)
            }
            None => {
                let vendor = catalog.vendor_of(item).cloned().ok_or_else(|| {
                    DomainError::validation(format!("item {item} has neither a BOM nor a vendor"))
                })?;
                SupplyRef::Purchase(self.add_purchase_line(&vendor, item, lot, quantity)?)
            }
        };
        self.record_supply(owner, order, item, lot, quantity);
        Ok(order)
    }

    fn record_supply(
        &mut self,
        owner: SupplyOwner,
        order: SupplyRef,
        item: &ItemCode,
        lot: Option<&LotCode>,
        quantity: i64,
    ) {
        let trigger_id = match owner {
            SupplyOwner::Trigger(t) => Some(t),
            SupplyOwner::Explosion(_) => None,
        };
        info!(%order, item = %item, quantity, "supply generated");
        self.state.supply.push(SupplyRecord {
            owner,
            order,
            item: item.clone(),
            lot: lot.cloned(),
            quantity,
            created_at: self.now,
        });
        let entity = match order {
            SupplyRef::Purchase(id) => id.0,
            SupplyRef::Manufacturing(id) => id.0,
        };
        let stream = match trigger_id {
            Some(_) => TRIGGER_STREAM,
            None => MANUFACTURING_STREAM,
        };
        self.emit(
            stream,
            entity,
            EngineEvent::SupplyGenerated {
                trigger_id,
                order,
                item: item.clone(),
                lot: lot.cloned(),
                quantity,
                occurred_at: self.now,
            },
        );
    }

    fn run_purchase(&mut self, id: PurchaseOrderId, command: PurchaseOrderCommand) -> DomainResult<()> {
        let order = self
            .state
            .purchase_orders
            .entry(id)
            .or_insert_with(|| PurchaseOrder::empty(id));
        let events = execute(order, &command)?;
        for event in events {
            self.emit(PURCHASE_STREAM, id.0, EngineEvent::PurchaseOrder(event));
        }
        Ok(())
    }

    fn run_manufacturing(
        &mut self,
        id: ManufacturingOrderId,
        command: ManufacturingOrderCommand,
    ) -> DomainResult<()> {
        let order = self
            .state
            .manufacturing_orders
            .entry(id)
            .or_insert_with(|| ManufacturingOrder::empty(id));
        let events = execute(order, &command)?;
        for event in events {
            self.emit(MANUFACTURING_STREAM, id.0, EngineEvent::ManufacturingOrder(event));
        }
        Ok(())
    }

    pub(crate) fn create_manufacturing_order(
        &mut self,
        item: ItemCode,
        quantity: i64,
        parent: Option<ManufacturingOrderId>,
    ) -> DomainResult<ManufacturingOrderId> {
        let id = ManufacturingOrderId::new(AggregateId::new());
        self.run_manufacturing(
            id,
            ManufacturingOrderCommand::Create(CreateManufacturingOrder {
                order_id: id,
                item,
                quantity,
                production_zone: self.config.production_zone.clone(),
                parent,
                occurred_at: self.now,
            }),
        )?;
        Ok(id)
    }

    /// Appends to the vendor's open draft purchase order, creating one when needed.
    /// Lines are merged per `(item, lot)`.
    fn add_purchase_line(
        &mut self,
        vendor: &PartyCode,
        item: &ItemCode,
        lot: Option<&LotCode>,
        quantity: i64,
    ) -> DomainResult<PurchaseOrderId> {
        let id = match self.state.draft_purchase_order_for(vendor) {
            Some(id) => id,
            None => {
                let id = PurchaseOrderId::new(AggregateId::new());
                self.run_purchase(
                    id,
                    PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                        order_id: id,
                        vendor: vendor.clone(),
                        occurred_at: self.now,
                    }),
                )?;
                id
            }
        };
        self.run_purchase(
            id,
            PurchaseOrderCommand::AddLine(AddLine {
                order_id: id,
                item: item.clone(),
                lot: lot.cloned(),
                quantity,
                occurred_at: self.now,
            }),
        )?;
        Ok(id)
    }

    pub(crate) fn is_draft_supply(&self, order: SupplyRef) -> bool {
        match order {
            SupplyRef::Purchase(id) => self
                .state
                .purchase_orders
                .get(&id)
                .is_some_and(|po| po.status() == PurchaseOrderStatus::Draft),
            SupplyRef::Manufacturing(id) => self
                .state
                .manufacturing_orders
                .get(&id)
                .is_some_and(|mo| mo.status() == ManufacturingOrderStatus::Draft),
        }
    }

    /// Confirms freshly generated supply when the engine runs with auto-confirmation.
    pub(crate) fn maybe_auto_confirm(&mut self, order: SupplyRef) -> DomainResult<()> {
        if !self.config.auto_confirm_supply || !self.is_draft_supply(order) {
            return Ok(());
        }
        match order {
            SupplyRef::Purchase(id) => self.confirm_purchase_order(id),
            SupplyRef::Manufacturing(id) => self.confirm_manufacturing_order(id),
        }
    }

    /// Confirms a generated purchase order and releases the moves waiting on it.
    pub(crate) fn confirm_purchase_order(&mut self, id: PurchaseOrderId) -> DomainResult<()> {
        self.run_purchase(
            id,
            PurchaseOrderCommand::Confirm(ConfirmPurchaseOrder {
                order_id: id,
                occurred_at: self.now,
            }),
        )?;
        info!(purchase_order = %id, "purchase order confirmed");
        self.promote_linked_moves(SupplyRef::Purchase(id))
    }

    pub(crate) fn cancel_purchase_order(&mut self, id: PurchaseOrderId) -> DomainResult<()> {
        self.run_purchase(
            id,
            PurchaseOrderCommand::Cancel(CancelPurchaseOrder {
                order_id: id,
                occurred_at: self.now,
            }),
        )?;
        info!(purchase_order = %id, "purchase order cancelled");
        self.cancel_linked_moves(SupplyRef::Purchase(id))
    }

    /// Confirms a manufacturing order, exploding its BOM into child orders and
    /// purchase lines, then releases the moves waiting on it.
    pub(crate) fn confirm_manufacturing_order(&mut self, id: ManufacturingOrderId) -> DomainResult<()> {
        self.run_manufacturing(
            id,
            ManufacturingOrderCommand::Confirm(ConfirmManufacturingOrder {
                order_id: id,
                occurred_at: self.now,
            }),
        )?;
        info!(manufacturing_order = %id, "manufacturing order confirmed");

        let mut path = Vec::new();
        let mut purchases = Vec::new();
        self.explode(id, &mut path, &mut purchases)?;
        if self.config.auto_confirm_supply {
            for po in purchases {
                if self.is_draft_supply(SupplyRef::Purchase(po)) {
                    self.confirm_purchase_order(po)?;
                }
            }
        }
        self.promote_linked_moves(SupplyRef::Manufacturing(id))
    }

    /// Recursive BOM explosion. `path` holds the items being produced above this order.
    fn explode(
        &mut self,
        id: ManufacturingOrderId,
        path: &mut Vec<ItemCode>,
        purchases: &mut Vec<PurchaseOrderId>,
    ) -> DomainResult<()> {
        if self.state.exploded.contains(&id) {
            return Ok(());
        }
        let catalog = self.catalog;
        let mo = self
            .state
            .manufacturing_orders
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("manufacturing order {id}")))?;
        let item = mo
            .item()
            .cloned()
            .ok_or_else(|| DomainError::invariant("manufacturing order without item"))?;
        let quantity = mo.quantity();
        if path.contains(&item) {
            return Err(DomainError::validation(format!("BOM cycle through item {item}")));
        }
        let bom = catalog
            .bom(&item)
            .ok_or_else(|| DomainError::validation(format!("item {item} has no BOM")))?;
        let requirements = bom.explode(quantity)?;
        self.state.exploded.insert(id);
        debug!(manufacturing_order = %id, item = %item, components = requirements.len(), "exploding BOM");

        path.push(item);
        let owner = SupplyOwner::Explosion(id);
        for req in requirements {
            if catalog.bom(&req.component).is_some() {
                if path.contains(&req.component) {
                    return Err(DomainError::validation(format!(
                        "BOM cycle through item {}",
                        req.component
                    )));
                }
                let child = self.create_manufacturing_order(req.component.clone(), req.quantity, Some(id))?;
                self.record_supply(
                    owner,
                    SupplyRef::Manufacturing(child),
                    &req.component,
                    req.lot.as_ref(),
                    req.quantity,
                );
                self.run_manufacturing(
                    child,
                    ManufacturingOrderCommand::Confirm(ConfirmManufacturingOrder {
                        order_id: child,
                        occurred_at: self.now,
                    }),
                )?;
                self.explode(child, path, purchases)?;
            } else {
                let vendor = catalog.vendor_of(&req.component).cloned().ok_or_else(|| {
                    DomainError::validation(format!(
                        "component {} has neither a BOM nor a vendor",
                        req.component
                    ))
                })?;
                let po = self.add_purchase_line(&vendor, &req.component, req.lot.as_ref(), req.quantity)?;
                self.record_supply(
                    owner,
                    SupplyRef::Purchase(po),
                    &req.component,
                    req.lot.as_ref(),
                    req.quantity,
                );
                self.deliver_component(po, &req)?;
                if !purchases.contains(&po) {
                    purchases.push(po);
                }
            }
        }
        path.pop();
        Ok(())
    }

    /// Move bringing a purchased component from the vendor to the production zone.
    fn deliver_component(&mut self, po: PurchaseOrderId, req: &ComponentRequirement) -> DomainResult<MoveId> {
        let production = self.config.production_zone.clone();
        let vendor_zone = self.config.vendor_zone.clone();
        let sequence = self.state.next_sequence();
        self.create_move(NewMove {
            trigger: None,
            sequence,
            rule: None,
            action: Action::Buy,
            role: MoveRole::Supply,
            item: req.component.clone(),
            lot: req.lot.clone(),
            quantity: req.quantity,
            source_zone: vendor_zone,
            target_zone: production,
            supply: Some(SupplyRef::Purchase(po)),
        })
    }

    /// Consumes components at the production zone and puts the output on its first
    /// location. Missing components reject the completion.
    pub(crate) fn complete_manufacturing_order(&mut self, id: ManufacturingOrderId) -> DomainResult<()> {
        let catalog = self.catalog;
        let graph = self.graph;
        let mo = self
            .state
            .manufacturing_orders
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("manufacturing order {id}")))?;
        if mo.status() != ManufacturingOrderStatus::Confirmed {
            return Err(DomainError::invariant(format!(
                "manufacturing order {id} must be confirmed before completion"
            )));
        }
        let item = mo
            .item()
            .cloned()
            .ok_or_else(|| DomainError::invariant("manufacturing order without item"))?;
        let zone = mo
            .production_zone()
            .cloned()
            .unwrap_or_else(|| self.config.production_zone.clone());
        let quantity = mo.quantity();

        let bom = catalog
            .bom(&item)
            .ok_or_else(|| DomainError::validation(format!("item {item} has no BOM")))?;
        for req in bom.explode(quantity)? {
            self.consume_component(&zone, &req)?;
        }

        self.run_manufacturing(
            id,
            ManufacturingOrderCommand::Complete(CompleteManufacturingOrder {
                order_id: id,
                occurred_at: self.now,
            }),
        )?;
        let output = graph.primary_location(&zone)?.clone();
        self.tx
            .receive(&StockKey::new(item.clone(), output.clone(), None), quantity)?;
        info!(manufacturing_order = %id, item = %item, quantity, location = %output, "production completed");
        self.reevaluate(&item, &output)
    }

    fn consume_component(&mut self, zone: &ZoneCode, req: &ComponentRequirement) -> DomainResult<()> {
        let graph = self.graph;
        let mut remaining = req.quantity;
        for location in graph.locations_in(zone) {
            if remaining == 0 {
                break;
            }
            let keys: Vec<StockKey> = match &req.lot {
                Some(lot) => vec![StockKey::new(req.component.clone(), location.clone(), Some(lot.clone()))],
                None => self
                    .tx
                    .cells_at(&req.component, location)
                    .into_iter()
                    .map(|(key, _)| key)
                    .collect(),
            };
            for key in keys {
                let take = self.tx.level(&key).available().min(remaining);
                if take > 0 {
                    self.tx.take(&key, take)?;
                    remaining -= take;
                }
            }
        }
        if remaining > 0 {
            return Err(DomainError::validation(format!(
                "insufficient {} at production zone {zone}: {remaining} missing",
                req.component
            )));
        }
        Ok(())
    }

    /// Cancels a manufacturing order, its open child orders and the draft purchase
    /// lines its explosion generated.
    pub(crate) fn cancel_manufacturing_order(&mut self, id: ManufacturingOrderId) -> DomainResult<()> {
        self.run_manufacturing(
            id,
            ManufacturingOrderCommand::Cancel(CancelManufacturingOrder {
                order_id: id,
                occurred_at: self.now,
            }),
        )?;
        info!(manufacturing_order = %id, "manufacturing order cancelled");
        self.cancel_linked_moves(SupplyRef::Manufacturing(id))?;
        self.shrink_supply(SupplyOwner::Explosion(id))
    }

    /// Gives back draft supply generated for `owner`: purchase lines are reduced (and
    /// emptied orders cancelled), draft manufacturing orders cancelled.
    pub(crate) fn shrink_supply(&mut self, owner: SupplyOwner) -> DomainResult<()> {
        let records: Vec<SupplyRecord> = self
            .state
            .supply
            .iter()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();

        for record in records {
            match record.order {
                SupplyRef::Purchase(po_id) => {
                    let Some(po) = self.state.purchase_orders.get(&po_id) else {
                        continue;
                    };
                    if po.status() != PurchaseOrderStatus::Draft {
                        continue;
                    }
                    let reduce = po
                        .line_for(&record.item, record.lot.as_ref())
                        .map(|l| l.quantity.min(record.quantity))
                        .unwrap_or(0);
                    if reduce > 0 {
                        self.run_purchase(
                            po_id,
                            PurchaseOrderCommand::ReduceLine(ReduceLine {
                                order_id: po_id,
                                item: record.item.clone(),
                                lot: record.lot.clone(),
                                quantity: reduce,
                                occurred_at: self.now,
                            }),
                        )?;
                    }
                    let emptied = self
                        .state
                        .purchase_orders
                        .get(&po_id)
                        .is_some_and(|po| po.lines().is_empty());
                    if emptied {
                        self.cancel_purchase_order(po_id)?;
                    } else {
                        self.cancel_component_delivery(po_id, &record)?;
                    }
                }
                SupplyRef::Manufacturing(mo_id) => {
                    let open = self.state.manufacturing_orders.get(&mo_id).is_some_and(|mo| {
                        matches!(
                            mo.status(),
                            ManufacturingOrderStatus::Draft | ManufacturingOrderStatus::Confirmed
                        )
                    });
                    // Confirmed child orders of an explosion go with their parent.
                    let cancellable = match owner {
                        SupplyOwner::Trigger(_) => self.is_draft_supply(record.order),
                        SupplyOwner::Explosion(_) => open,
                    };
                    if cancellable {
                        self.cancel_manufacturing_order(mo_id)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Cancels the vendor-to-production move of one exploded component.
    fn cancel_component_delivery(&mut self, po: PurchaseOrderId, record: &SupplyRecord) -> DomainResult<()> {
        if !matches!(record.owner, SupplyOwner::Explosion(_)) {
            return Ok(());
        }
        let target = self
            .state
            .moves
            .values()
            .find(|m| {
                m.supply == Some(SupplyRef::Purchase(po))
                    && m.trigger.is_none()
                    && m.item == record.item
                    && m.lot == record.lot
                    && m.quantity == record.quantity
                    && !m.status.is_terminal()
            })
            .map(|m| m.id);
        match target {
            Some(move_id) => self.cancel_move(move_id),
            None => Ok(()),
        }
    }

    /// Draft moves linked to `order` become confirmed and try to get their stock.
    pub(crate) fn promote_linked_moves(&mut self, order: SupplyRef) -> DomainResult<()> {
        let waiting: Vec<MoveId> = self
            .state
            .moves
            .values()
            .filter(|m| m.supply == Some(order) && m.status == MoveStatus::Draft)
            .map(|m| m.id)
            .collect();
        for move_id in waiting {
            self.set_move_status(move_id, MoveStatus::Confirmed)?;
            self.try_assign(move_id)?;
        }
        Ok(())
    }

    fn cancel_linked_moves(&mut self, order: SupplyRef) -> DomainResult<()> {
        let linked: Vec<MoveId> = self
            .state
            .moves
            .values()
            .filter(|m| m.supply == Some(order) && !m.status.is_terminal())
            .map(|m| m.id)
            .collect();
        for move_id in linked {
            self.cancel_move(move_id)?;
        }
        Ok(())
    }
}
