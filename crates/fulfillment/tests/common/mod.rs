#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;

use wms_core::AggregateId;
use wms_events::integration::{OrderCancelled, OrderConfirmed, OrderLineRef, OriginModel, StockAdjustment};
use wms_fulfillment::{EngineConfig, FulfillmentEngine, InMemoryCatalog, Move, MoveStatus};
use wms_inventory::{StockKey, StockLevel};
use wms_manufacturing::Bom;
use wms_routing::{Action, Location, Route, Rule, RuleGraph, Topology, Zone};

fn zone(code: &str, description: &str) -> Zone {
    Zone {
        code: code.into(),
        description: description.to_string(),
    }
}

fn location(code: &str, zone: &str) -> Location {
    Location {
        code: code.into(),
        description: String::new(),
        origin: Default::default(),
        dimensions: Default::default(),
        zones: vec![zone.into()],
    }
}

fn route(code: &str) -> Route {
    Route {
        code: code.into(),
        name: code.to_lowercase(),
        description: String::new(),
        active: true,
    }
}

fn rule(code: &str, route: &str, source: &str, target: &str, action: Action) -> Rule {
    Rule {
        code: code.to_string(),
        route: route.into(),
        source: source.into(),
        target: target.into(),
        action,
        active: true,
    }
}

/// Stock (ZON01), pick (ZON02), production (ZON07), vendor (ZON08) and customer (ZON09),
/// one location each.
pub fn topology() -> Topology {
    Topology {
        zones: vec![
            zone("ZON01", "stock"),
            zone("ZON02", "pick"),
            zone("ZON07", "production"),
            zone("ZON08", "vendor"),
            zone("ZON09", "customer"),
        ],
        locations: vec![
            location("L01", "ZON01"),
            location("L02", "ZON02"),
            location("L07", "ZON07"),
            location("L08", "ZON08"),
            location("L09", "ZON09"),
        ],
        routes: ["SALES", "RECEIPTS", "RETURNS", "MANUFACTURING", "TRANSFERS", "PICKING", "DIRECT", "LOOP"]
            .into_iter()
            .map(route)
            .collect(),
        rules: vec![
            rule("SALE-SHIP", "SALES", "ZON01", "ZON09", Action::Pull),
            rule("SALE-BUY", "SALES", "ZON08", "ZON01", Action::Buy),
            rule("RECEIVE", "RECEIPTS", "ZON08", "ZON01", Action::Push),
            rule("RETURN-IN", "RETURNS", "ZON09", "ZON01", Action::Push),
            rule("MFG-FEED", "MANUFACTURING", "ZON01", "ZON07", Action::Pull),
            rule("MOVE-PICK", "TRANSFERS", "ZON01", "ZON02", Action::Pull),
            rule("PICK-SHIP", "PICKING", "ZON02", "ZON09", Action::Pull),
            rule("DIRECT-SHIP", "DIRECT", "ZON01", "ZON09", Action::PullOrBuy),
            rule("LOOP-SHIP", "LOOP", "ZON02", "ZON09", Action::Pull),
            rule("LOOP-PICK", "LOOP", "ZON01", "ZON02", Action::Pull),
            rule("LOOP-BACK", "LOOP", "ZON02", "ZON01", Action::Pull),
        ],
    }
}

/// WIDGET and GIZMO are bought from ACME; GADGET is made of 2 COMP-A + 1 COMP-B.
pub fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_vendor("WIDGET", "ACME")
        .with_vendor("GIZMO", "ACME")
        .with_vendor("COMP-A", "ACME")
        .with_vendor("COMP-B", "BOLTCO")
        .with_bom(Bom::new("GADGET").with_line("COMP-A", 2).with_line("COMP-B", 1))
        .with_dropship_vendor("ACME", true)
        .with_vendor_stock("ACME", "WIDGET", 100)
}

pub fn engine() -> FulfillmentEngine {
    engine_with(EngineConfig::default(), catalog())
}

pub fn engine_with(config: EngineConfig, catalog: InMemoryCatalog) -> FulfillmentEngine {
    let graph = RuleGraph::load(topology()).unwrap();
    FulfillmentEngine::new(config, graph, Arc::new(catalog)).unwrap()
}

pub fn order(model: OriginModel, lines: Vec<OrderLineRef>) -> OrderConfirmed {
    OrderConfirmed {
        origin_model: model,
        origin_id: AggregateId::new(),
        lines,
        occurred_at: Utc::now(),
    }
}

pub fn sale(lines: Vec<OrderLineRef>) -> OrderConfirmed {
    order(OriginModel::SaleOrder, lines)
}

pub fn cancellation(confirmed: &OrderConfirmed) -> OrderCancelled {
    OrderCancelled {
        origin_model: confirmed.origin_model,
        origin_id: confirmed.origin_id,
        occurred_at: Utc::now(),
    }
}

pub fn adjustment(item: &str, location: &str, delta: i64) -> StockAdjustment {
    StockAdjustment {
        item: item.into(),
        location: location.into(),
        lot: None,
        delta,
        reason: "cycle count".to_string(),
        occurred_at: Utc::now(),
    }
}

pub fn level(engine: &FulfillmentEngine, item: &str, location: &str) -> StockLevel {
    engine
        .ledger()
        .level(&StockKey::new(item.into(), location.into(), None))
}

pub fn moves_in(engine: &FulfillmentEngine, status: MoveStatus) -> Vec<Move> {
    engine
        .moves()
        .into_iter()
        .filter(|m| m.status == status)
        .collect()
}

/// Completes every line of a move.
pub fn finish_move(engine: &FulfillmentEngine, mv: &Move) {
    for line in engine.move_lines_of(mv.id) {
        engine.mark_move_line_done(line.id).unwrap();
    }
}
