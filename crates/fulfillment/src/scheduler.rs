//! Trigger resolution and the move scheduler.
//!
//! A trigger resolves through the single rule delivering into its target zone. The
//! rule's action decides whether the demand move reserves stock at the source zone,
//! chains a new trigger upstream, waits for inbound stock or calls supply generation.
//! Moves that come up short stay `confirmed`/`intervene` until a stock-increasing
//! operation re-evaluates them in trigger order.

use tracing::{debug, info, warn};

use wms_core::{DomainError, DomainResult, ItemCode, LocationCode, LotCode, RouteCode, ZoneCode};
use wms_inventory::StockKey;
use wms_routing::{Action, Rule};

use crate::events::{EngineEvent, INTERVENTION_STREAM, MOVE_STREAM, TRIGGER_STREAM};
use crate::intervention::{Intervention, InterventionId, InterventionStatus};
use crate::movement::{Move, MoveId, MoveLine, MoveLineId, MoveRole, MoveStatus, SupplyRef};
use crate::state::Ctx;
use crate::supply::SupplyOwner;
use crate::trigger::{OriginRef, Trigger, TriggerId, TriggerStatus};

/// Fields of a move about to be planned.
pub(crate) struct NewMove {
    pub trigger: Option<TriggerId>,
    pub sequence: u64,
    pub rule: Option<String>,
    pub action: Action,
    pub role: MoveRole,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
    pub source_zone: ZoneCode,
    pub target_zone: ZoneCode,
    pub supply: Option<SupplyRef>,
}

/// Demand to anchor at a zone.
pub(crate) struct NewTrigger {
    pub origin: OriginRef,
    pub parent: Option<TriggerId>,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
    pub target_zone: ZoneCode,
    pub route: RouteCode,
}

impl Ctx<'_> {
    /// Creates the trigger for `(origin line, target zone)` unless it already exists.
    /// Returns the trigger id and whether it was created now.
    pub(crate) fn create_trigger(&mut self, new: NewTrigger) -> DomainResult<(TriggerId, bool)> {
        let key = (new.origin, new.target_zone.clone());
        if let Some(existing) = self.state.trigger_index.get(&key) {
            debug!(trigger = %existing, origin = %new.origin, zone = %new.target_zone, "trigger already exists");
            return Ok((*existing, false));
        }
        if new.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "demand quantity must be positive, got {} for {}",
                new.quantity, new.origin
            )));
        }

        let id = TriggerId::new();
        let sequence = self.state.next_sequence();
        let trigger = Trigger {
            id,
            sequence,
            origin: new.origin,
            parent: new.parent,
            item: new.item,
            lot: new.lot,
            quantity: new.quantity,
            target_zone: new.target_zone,
            route: new.route,
            status: TriggerStatus::Pending,
            done_quantity: 0,
            created_at: self.now,
        };
        info!(
            trigger = %id,
            origin = %trigger.origin,
            item = %trigger.item,
            quantity = trigger.quantity,
            zone = %trigger.target_zone,
            route = %trigger.route,
            "trigger created"
        );
        self.emit(
            TRIGGER_STREAM,
            id,
            EngineEvent::TriggerCreated {
                trigger_id: id,
                sequence,
                origin: trigger.origin,
                parent: trigger.parent,
                item: trigger.item.clone(),
                lot: trigger.lot.clone(),
                quantity: trigger.quantity,
                target_zone: trigger.target_zone.clone(),
                route: trigger.route.clone(),
                occurred_at: self.now,
            },
        );
        self.state.trigger_index.insert(key, id);
        self.state.triggers.insert(id, trigger);
        Ok((id, true))
    }

    /// Plans the demand move of a pending trigger. Calling it again only retries the
    /// stock lookup of a waiting move and of its upstream triggers.
    pub(crate) fn resolve_trigger(&mut self, id: TriggerId) -> DomainResult<()> {
        let trigger = self
            .state
            .triggers
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("trigger {id}")))?;
        if !trigger.is_pending() {
            return Ok(());
        }
        if let Some(existing) = self.state.demand_move(id) {
            return self.retry_move(existing);
        }

        let graph = self.graph;
        let rule: Rule = graph.resolve(&trigger.route, &trigger.target_zone)?.clone();
        if self.state.chain_zones(id).contains(&rule.source) {
            return Err(DomainError::configuration(format!(
                "routing cycle: rule {} on route {} leads back into zone {}",
                rule.code, rule.route, rule.source
            )));
        }
        debug!(trigger = %id, rule = %rule.code, action = %rule.action, "rule resolved");

        let move_id = self.create_move(NewMove {
            trigger: Some(id),
            sequence: trigger.sequence,
            rule: Some(rule.code.clone()),
            action: rule.action,
            role: MoveRole::Demand,
            item: trigger.item.clone(),
            lot: trigger.lot.clone(),
            quantity: trigger.quantity,
            source_zone: rule.source.clone(),
            target_zone: rule.target.clone(),
            supply: None,
        })?;

        match rule.action {
            Action::Push => {
                self.set_move_status(move_id, MoveStatus::Confirmed)?;
                self.try_assign(move_id)?;
                Ok(())
            }
            Action::Pull => {
                self.set_move_status(move_id, MoveStatus::Confirmed)?;
                self.pull(&trigger, move_id)
            }
            Action::Buy => self.buy(&trigger, move_id),
            Action::PullOrBuy => {
                self.set_move_status(move_id, MoveStatus::Confirmed)?;
                self.pull_or_buy(&trigger, move_id)
            }
        }
    }

    fn pull(&mut self, trigger: &Trigger, move_id: MoveId) -> DomainResult<()> {
        if self.try_assign(move_id)? {
            return Ok(());
        }
        let shortfall = self.shortfall_of(move_id)?;
        self.set_move_status(move_id, MoveStatus::Intervene)?;
        self.open_intervention(move_id, shortfall)?;
        self.chain_upstream(trigger, move_id, shortfall)
    }

    fn pull_or_buy(&mut self, trigger: &Trigger, move_id: MoveId) -> DomainResult<()> {
        if self.try_assign(move_id)? {
            return Ok(());
        }
        let shortfall = self.shortfall_of(move_id)?;
        self.set_move_status(move_id, MoveStatus::Intervene)?;
        self.open_intervention(move_id, shortfall)?;
        let order = self.supply_shortfall(trigger.id, &trigger.item, trigger.lot.as_ref(), shortfall)?;
        self.create_companion(trigger, move_id, order, shortfall)?;
        self.maybe_auto_confirm(order)
    }

    fn buy(&mut self, trigger: &Trigger, move_id: MoveId) -> DomainResult<()> {
        let order = self.supply_shortfall(trigger.id, &trigger.item, trigger.lot.as_ref(), trigger.quantity)?;
        if let Some(mv) = self.state.moves.get_mut(&move_id) {
            mv.supply = Some(order);
        }
        debug!(move_id = %move_id, %order, "move waits for supply confirmation");
        if self.is_draft_supply(order) {
            self.maybe_auto_confirm(order)
        } else {
            self.promote_linked_moves(order)
        }
    }

    /// Supply move bringing generated supply into the zone a short move draws from.
    fn create_companion(
        &mut self,
        trigger: &Trigger,
        move_id: MoveId,
        order: SupplyRef,
        quantity: i64,
    ) -> DomainResult<()> {
        let source = self.move_ref(move_id)?.source_zone.clone();
        let from = match order {
            SupplyRef::Purchase(_) => self.config.vendor_zone.clone(),
            SupplyRef::Manufacturing(_) => self.config.production_zone.clone(),
        };
        if from == source {
            return Ok(());
        }
        let companion = self.create_move(NewMove {
            trigger: Some(trigger.id),
            sequence: trigger.sequence,
            rule: None,
            action: Action::Buy,
            role: MoveRole::Supply,
            item: trigger.item.clone(),
            lot: trigger.lot.clone(),
            quantity,
            source_zone: from,
            target_zone: source,
            supply: Some(order),
        })?;
        debug!(move_id = %companion, %order, "companion supply move planned");
        Ok(())
    }

    /// Raises a child trigger at the source zone of a short pull. Without an upstream
    /// rule the shortage waits for a stock correction.
    fn chain_upstream(&mut self, trigger: &Trigger, move_id: MoveId, shortfall: i64) -> DomainResult<()> {
        let source = self.move_ref(move_id)?.source_zone.clone();
        if !self.graph.has_rule(&trigger.route, &source) {
            warn!(
                trigger = %trigger.id,
                zone = %source,
                shortfall,
                "no upstream rule, waiting for stock correction"
            );
            return Ok(());
        }
        if self.state.chain_zones(trigger.id).contains(&source) {
            return Err(DomainError::configuration(format!(
                "routing cycle: zone {source} repeats in the chain of trigger {}",
                trigger.id
            )));
        }
        let (child, created) = self.create_trigger(NewTrigger {
            origin: trigger.origin,
            parent: Some(trigger.id),
            item: trigger.item.clone(),
            lot: trigger.lot.clone(),
            quantity: shortfall,
            target_zone: source,
            route: trigger.route.clone(),
        })?;
        if created {
            self.resolve_trigger(child)?;
        }
        Ok(())
    }

    pub(crate) fn create_move(&mut self, new: NewMove) -> DomainResult<MoveId> {
        let target_location = self.graph.primary_location(&new.target_zone)?.clone();
        let id = MoveId::new();
        let mv = Move {
            id,
            trigger: new.trigger,
            sequence: new.sequence,
            rule: new.rule,
            action: new.action,
            role: new.role,
            item: new.item,
            lot: new.lot,
            quantity: new.quantity,
            source_zone: new.source_zone,
            target_zone: new.target_zone,
            target_location,
            status: MoveStatus::Draft,
            supply: new.supply,
            lines: Vec::new(),
            created_at: self.now,
            updated_at: self.now,
        };
        debug!(
            move_id = %id,
            item = %mv.item,
            quantity = mv.quantity,
            from = %mv.source_zone,
            to = %mv.target_zone,
            action = %mv.action,
            "move planned"
        );
        self.emit(
            MOVE_STREAM,
            id,
            EngineEvent::MoveCreated {
                move_id: id,
                trigger_id: mv.trigger,
                rule: mv.rule.clone(),
                action: mv.action,
                role: mv.role,
                item: mv.item.clone(),
                quantity: mv.quantity,
                source_zone: mv.source_zone.clone(),
                target_zone: mv.target_zone.clone(),
                occurred_at: self.now,
            },
        );
        self.state.moves.insert(id, mv);
        Ok(id)
    }

    fn shortfall_of(&self, move_id: MoveId) -> DomainResult<i64> {
        let quantity = self.move_ref(move_id)?.quantity;
        Ok(quantity - self.state.lined_quantity(move_id))
    }

    /// Tries to give a waiting move all of its quantity. Returns whether it is assigned.
    pub(crate) fn try_assign(&mut self, move_id: MoveId) -> DomainResult<bool> {
        let mv = self.move_ref(move_id)?;
        if !mv.is_waiting() {
            return Ok(mv.status == MoveStatus::Assigned);
        }
        if self.config.is_external(&mv.source_zone) {
            self.assign_external(move_id)?;
            return Ok(true);
        }
        let demand_of = match mv.role {
            MoveRole::Demand => mv.trigger,
            _ => None,
        };
        let shortfall = self.fill(move_id)?;
        if shortfall == 0 {
            self.resolve_interventions(move_id)?;
            self.set_move_status(move_id, MoveStatus::Assigned)?;
            debug!(move_id = %move_id, "move assigned");
            if let Some(trigger) = demand_of {
                self.drop_upstream(trigger)?;
            }
            Ok(true)
        } else {
            self.update_interventions(move_id, shortfall);
            Ok(false)
        }
    }

    /// Cancels the pending upstream chain of a trigger whose demand move is now covered
    /// from stock, shrinking the draft supply raised for it. Chains already holding
    /// confirmed supply or moved stock are left to run.
    fn drop_upstream(&mut self, trigger: TriggerId) -> DomainResult<()> {
        for child in self.state.children_of(trigger) {
            let pending = self.state.triggers.get(&child).is_some_and(Trigger::is_pending);
            if !pending || self.upstream_committed(child) {
                continue;
            }
            self.drop_upstream(child)?;
            self.cancel_trigger(child)?;
            self.shrink_supply(SupplyOwner::Trigger(child))?;
            info!(trigger = %child, parent = %trigger, "upstream demand no longer needed");
        }
        Ok(())
    }

    fn upstream_committed(&self, trigger: TriggerId) -> bool {
        let supply_committed = self
            .state
            .supply
            .iter()
            .filter(|r| r.owner == SupplyOwner::Trigger(trigger))
            .any(|r| !self.is_draft_supply(r.order));
        let moved = self
            .state
            .moves
            .values()
            .filter(|m| m.trigger == Some(trigger))
            .any(|m| {
                m.supply.is_some_and(|order| !self.is_draft_supply(order))
                    || m
                        .lines
                        .iter()
                        .filter_map(|id| self.state.move_lines.get(id))
                        .any(|l| l.done_quantity > 0)
            });
        supply_committed
            || moved
            || self
                .state
                .children_of(trigger)
                .into_iter()
                .any(|child| self.upstream_committed(child))
    }

    /// Reserves what the source zone has for the unplanned part of a move, location by
    /// location. Returns the quantity still missing.
    fn fill(&mut self, move_id: MoveId) -> DomainResult<i64> {
        let graph = self.graph;
        let mv = self.move_ref(move_id)?;
        let item = mv.item.clone();
        let lot = mv.lot.clone();
        let source_zone = mv.source_zone.clone();
        let mut need = self.shortfall_of(move_id)?;

        for location in graph.locations_in(&source_zone) {
            if need == 0 {
                break;
            }
            let cells: Vec<StockKey> = self
                .tx
                .cells_at(&item, location)
                .into_iter()
                .filter(|(key, level)| level.available() > 0 && (lot.is_none() || key.lot == lot))
                .map(|(key, _)| key)
                .collect();
            for key in cells {
                if need == 0 {
                    break;
                }
                let wanted = self.tx.level(&key).available().min(need);
                if wanted <= 0 {
                    continue;
                }
                let granted = self.tx.reserve(&key, wanted)?;
                if granted > 0 {
                    self.add_line(move_id, key.location.clone(), key.lot.clone(), granted, true)?;
                    need -= granted;
                }
            }
        }
        Ok(need)
    }

    /// Plans the whole remaining quantity of a move out of an external zone.
    fn assign_external(&mut self, move_id: MoveId) -> DomainResult<()> {
        let graph = self.graph;
        let (source_zone, lot) = {
            let mv = self.move_ref(move_id)?;
            (mv.source_zone.clone(), mv.lot.clone())
        };
        let need = self.shortfall_of(move_id)?;
        if need > 0 {
            let location = graph.primary_location(&source_zone)?.clone();
            self.add_line(move_id, location, lot, need, false)?;
        }
        self.resolve_interventions(move_id)?;
        self.set_move_status(move_id, MoveStatus::Assigned)
    }

    /// Adds planned quantity to a move, merging into the open line for the same cell.
    fn add_line(
        &mut self,
        move_id: MoveId,
        source_location: LocationCode,
        lot: Option<LotCode>,
        quantity: i64,
        reserved: bool,
    ) -> DomainResult<MoveLineId> {
        let (item, target_location, line_ids) = {
            let mv = self.move_ref(move_id)?;
            (mv.item.clone(), mv.target_location.clone(), mv.lines.clone())
        };
        let existing = line_ids.into_iter().find(|id| {
            self.state.move_lines.get(id).is_some_and(|l| {
                l.source_location == source_location && l.lot == lot && l.reserved == reserved
            })
        });

        let line_id = match existing {
            Some(id) => {
                if let Some(line) = self.state.move_lines.get_mut(&id) {
                    line.quantity += quantity;
                }
                id
            }
            None => {
                let id = MoveLineId::new();
                self.state.move_lines.insert(
                    id,
                    MoveLine {
                        id,
                        move_id,
                        item,
                        lot: lot.clone(),
                        source_location: source_location.clone(),
                        target_location,
                        quantity,
                        done_quantity: 0,
                        reserved,
                    },
                );
                if let Some(mv) = self.state.moves.get_mut(&move_id) {
                    mv.lines.push(id);
                }
                id
            }
        };
        self.emit(
            MOVE_STREAM,
            move_id,
            EngineEvent::MoveLineReserved {
                move_line_id: line_id,
                move_id,
                source_location,
                lot,
                quantity,
                occurred_at: self.now,
            },
        );
        Ok(line_id)
    }

    fn open_intervention(&mut self, move_id: MoveId, shortfall: i64) -> DomainResult<()> {
        if !self.state.open_interventions_of(move_id).is_empty() {
            self.update_interventions(move_id, shortfall);
            return Ok(());
        }
        let mv = self.move_ref(move_id)?.clone();
        let blocking_location = self.graph.primary_location(&mv.source_zone)?.clone();
        let id = InterventionId::new();
        warn!(
            intervention = %id,
            move_id = %move_id,
            item = %mv.item,
            zone = %mv.source_zone,
            shortfall,
            "stock shortage, intervention opened"
        );
        self.emit(
            INTERVENTION_STREAM,
            id,
            EngineEvent::InterventionOpened {
                intervention_id: id,
                move_id,
                item: mv.item.clone(),
                zone: mv.source_zone.clone(),
                shortfall,
                occurred_at: self.now,
            },
        );
        self.state.interventions.insert(
            id,
            Intervention {
                id,
                move_id,
                trigger: mv.trigger,
                sequence: mv.sequence,
                item: mv.item,
                lot: mv.lot,
                zone: mv.source_zone,
                blocking_location,
                shortfall,
                status: InterventionStatus::Open,
                opened_at: self.now,
                resolved_at: None,
            },
        );
        Ok(())
    }

    fn update_interventions(&mut self, move_id: MoveId, shortfall: i64) {
        for id in self.state.open_interventions_of(move_id) {
            if let Some(intervention) = self.state.interventions.get_mut(&id) {
                intervention.shortfall = shortfall;
            }
        }
    }

    fn resolve_interventions(&mut self, move_id: MoveId) -> DomainResult<()> {
        self.close_interventions(move_id, InterventionStatus::Resolved)
    }

    fn close_interventions(&mut self, move_id: MoveId, status: InterventionStatus) -> DomainResult<()> {
        for id in self.state.open_interventions_of(move_id) {
            let intervention = self
                .state
                .interventions
                .get_mut(&id)
                .ok_or_else(|| DomainError::not_found(format!("intervention {id}")))?;
            intervention.status = status;
            intervention.resolved_at = Some(self.now);
            let event = match status {
                InterventionStatus::Resolved => {
                    info!(intervention = %id, move_id = %move_id, "intervention resolved");
                    EngineEvent::InterventionResolved {
                        intervention_id: id,
                        move_id,
                        occurred_at: self.now,
                    }
                }
                _ => {
                    debug!(intervention = %id, move_id = %move_id, "intervention cancelled");
                    EngineEvent::InterventionCancelled {
                        intervention_id: id,
                        move_id,
                        occurred_at: self.now,
                    }
                }
            };
            self.emit(INTERVENTION_STREAM, id, event);
        }
        Ok(())
    }

    /// Hands newly arrived stock at `location` to waiting moves drawing on one of its
    /// zones, oldest demand first.
    pub(crate) fn reevaluate(&mut self, item: &ItemCode, location: &LocationCode) -> DomainResult<()> {
        let zones = self.graph.zones_of(location);
        let mut waiting: Vec<(u64, MoveId)> = self
            .state
            .moves
            .values()
            .filter(|m| m.is_waiting() && &m.item == item && zones.contains(&m.source_zone))
            .map(|m| (m.sequence, m.id))
            .collect();
        waiting.sort();
        if !waiting.is_empty() {
            debug!(item = %item, location = %location, candidates = waiting.len(), "re-evaluating waiting moves");
        }
        for (_, move_id) in waiting {
            self.try_assign(move_id)?;
        }
        Ok(())
    }

    /// Offers stock given back by cancelled moves to the moves still waiting on it,
    /// until no more reservations come free.
    pub(crate) fn reoffer_released(&mut self) -> DomainResult<()> {
        while !self.released.is_empty() {
            let mut released = std::mem::take(&mut self.released);
            released.sort();
            released.dedup();
            for (item, location) in released {
                self.reevaluate(&item, &location)?;
            }
        }
        Ok(())
    }

    /// Retries a waiting demand move and everything upstream of its trigger.
    fn retry_move(&mut self, move_id: MoveId) -> DomainResult<()> {
        let trigger = self.move_ref(move_id)?.trigger;
        if let Some(trigger) = trigger {
            for child in self.state.children_of(trigger) {
                self.resolve_trigger(child)?;
            }
        }
        self.try_assign(move_id)?;
        Ok(())
    }

    /// Records completed quantity on a line of an assigned move and moves the stock.
    /// `None` completes whatever is left; completing a finished line is a no-op.
    pub(crate) fn progress_line(&mut self, line_id: MoveLineId, delta: Option<i64>) -> DomainResult<()> {
        let line = self
            .state
            .move_lines
            .get(&line_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("move line {line_id}")))?;
        let delta = match delta {
            None if line.is_done() => {
                debug!(move_line = %line_id, "move line already done");
                return Ok(());
            }
            None => line.remaining(),
            Some(d) if d <= 0 => {
                return Err(DomainError::validation(format!(
                    "progress on move line {line_id} must be positive, got {d}"
                )));
            }
            Some(d) if d > line.remaining() => {
                return Err(DomainError::validation(format!(
                    "move line {line_id} has {} left, cannot complete {d}",
                    line.remaining()
                )));
            }
            Some(d) => d,
        };

        let mv = self.move_ref(line.move_id)?.clone();
        if mv.status != MoveStatus::Assigned {
            return Err(DomainError::invariant(format!(
                "move {} is {}, only assigned moves can be completed",
                mv.id, mv.status
            )));
        }

        let source = StockKey::new(line.item.clone(), line.source_location.clone(), line.lot.clone());
        if line.reserved {
            self.tx.consume_reserved(&source, delta)?;
        }
        let target = StockKey::new(line.item.clone(), line.target_location.clone(), line.lot.clone());
        self.tx.receive(&target, delta)?;

        let done_quantity = line.done_quantity + delta;
        if let Some(l) = self.state.move_lines.get_mut(&line_id) {
            l.done_quantity = done_quantity;
        }
        self.emit(
            MOVE_STREAM,
            mv.id,
            EngineEvent::MoveLineProgressed {
                move_line_id: line_id,
                move_id: mv.id,
                delta,
                done_quantity,
                occurred_at: self.now,
            },
        );

        if mv.role == MoveRole::Demand {
            if let Some(trigger_id) = mv.trigger {
                self.count_done(trigger_id, delta)?;
            }
        }

        let all_done = mv
            .lines
            .iter()
            .filter_map(|id| self.state.move_lines.get(id))
            .all(MoveLine::is_done);
        let lined = self.state.lined_quantity(mv.id);
        if all_done && lined == mv.quantity {
            self.set_move_status(mv.id, MoveStatus::Done)?;
            info!(move_id = %mv.id, item = %mv.item, quantity = mv.quantity, "move done");
            if mv.role == MoveRole::Demand {
                if let Some(trigger_id) = mv.trigger {
                    self.settle_trigger(trigger_id)?;
                }
            }
        }

        self.reevaluate(&line.item, &line.target_location)
    }

    fn count_done(&mut self, trigger_id: TriggerId, delta: i64) -> DomainResult<()> {
        let trigger = self
            .state
            .triggers
            .get_mut(&trigger_id)
            .ok_or_else(|| DomainError::not_found(format!("trigger {trigger_id}")))?;
        if trigger.done_quantity + delta > trigger.quantity {
            return Err(DomainError::invariant(format!(
                "trigger {trigger_id} would exceed its quantity {}",
                trigger.quantity
            )));
        }
        trigger.done_quantity += delta;
        Ok(())
    }

    fn settle_trigger(&mut self, trigger_id: TriggerId) -> DomainResult<()> {
        let trigger = self
            .state
            .triggers
            .get_mut(&trigger_id)
            .ok_or_else(|| DomainError::not_found(format!("trigger {trigger_id}")))?;
        if !trigger.is_pending() || trigger.done_quantity != trigger.quantity {
            return Ok(());
        }
        trigger.status = TriggerStatus::Resolved;
        info!(trigger = %trigger_id, quantity = trigger.quantity, "trigger resolved");
        self.emit(
            TRIGGER_STREAM,
            trigger_id,
            EngineEvent::TriggerResolved {
                trigger_id,
                occurred_at: self.now,
            },
        );
        Ok(())
    }

    /// Cancels a move and gives back what its lines still hold.
    pub(crate) fn cancel_move(&mut self, move_id: MoveId) -> DomainResult<()> {
        let mv = self.move_ref(move_id)?.clone();
        if mv.status.is_terminal() {
            return Ok(());
        }
        for line_id in &mv.lines {
            let Some(line) = self.state.move_lines.get(line_id) else {
                continue;
            };
            let remaining = line.remaining();
            if line.reserved && remaining > 0 {
                let key = StockKey::new(line.item.clone(), line.source_location.clone(), line.lot.clone());
                self.tx.release(&key, remaining)?;
                self.released.push((key.item, key.location));
            }
        }
        self.close_interventions(move_id, InterventionStatus::Cancelled)?;
        self.set_move_status(move_id, MoveStatus::Cancelled)?;
        debug!(move_id = %move_id, "move cancelled");
        Ok(())
    }

    /// Cancels a pending trigger and its live moves.
    pub(crate) fn cancel_trigger(&mut self, trigger_id: TriggerId) -> DomainResult<()> {
        let pending = self
            .state
            .triggers
            .get(&trigger_id)
            .is_some_and(Trigger::is_pending);
        if !pending {
            return Ok(());
        }
        for move_id in self.state.moves_of(trigger_id) {
            self.cancel_move(move_id)?;
        }
        if let Some(trigger) = self.state.triggers.get_mut(&trigger_id) {
            trigger.status = TriggerStatus::Cancelled;
        }
        info!(trigger = %trigger_id, "trigger cancelled");
        self.emit(
            TRIGGER_STREAM,
            trigger_id,
            EngineEvent::TriggerCancelled {
                trigger_id,
                occurred_at: self.now,
            },
        );
        Ok(())
    }
}
