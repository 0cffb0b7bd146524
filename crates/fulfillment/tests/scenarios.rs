mod common;

use wms_core::DomainError;
use wms_events::integration::{OrderLineRef, OriginModel};
use wms_fulfillment::{
    EngineConfig, InterventionStatus, MoveRole, MoveStatus, SupplyRef, TriggerStatus,
};
use wms_purchasing::PurchaseOrderStatus;

use common::*;

#[test]
fn sale_without_stock_chains_upstream_into_a_single_purchase_order() {
    let engine = engine();
    let confirmed = sale(vec![OrderLineRef::new(1, "WIDGET", 10)]);

    let outcome = engine.on_order_confirmed(&confirmed).unwrap();
    assert!(outcome.is_pending());
    assert_eq!(outcome.triggers.len(), 2);

    let orders = engine.purchase_orders();
    assert_eq!(orders.len(), 1);
    let po = &orders[0];
    assert_eq!(po.vendor().map(|v| v.as_str()), Some("ACME"));
    assert_eq!(po.status(), PurchaseOrderStatus::Draft);
    assert_eq!(po.lines().len(), 1);
    assert_eq!(po.lines()[0].item.as_str(), "WIDGET");
    assert_eq!(po.lines()[0].quantity, 10);

    let intervene = moves_in(&engine, MoveStatus::Intervene);
    assert_eq!(intervene.len(), 1);
    assert_eq!(intervene[0].source_zone.as_str(), "ZON01");
    let draft = moves_in(&engine, MoveStatus::Draft);
    assert_eq!(draft.len(), 1);
    assert_eq!(draft[0].source_zone.as_str(), "ZON08");
    assert_eq!(draft[0].supply, Some(SupplyRef::Purchase(po.id_typed())));
}

#[test]
fn replayed_confirmation_and_retries_create_nothing_new() {
    let engine = engine();
    let confirmed = sale(vec![OrderLineRef::new(1, "WIDGET", 10)]);
    engine.on_order_confirmed(&confirmed).unwrap();
    let moves_before = engine.moves().len();
    let events_before = engine.events().len();

    let replay = engine.on_order_confirmed(&confirmed).unwrap();
    assert!(replay.triggers.is_empty());
    assert!(replay.moves.is_empty());

    for trigger in engine.triggers() {
        engine.resolve_trigger(trigger.id).unwrap();
    }

    assert_eq!(engine.triggers().len(), 2);
    assert_eq!(engine.moves().len(), moves_before);
    assert_eq!(engine.purchase_orders().len(), 1);
    assert_eq!(engine.purchase_orders()[0].total_quantity(), 10);
    assert_eq!(engine.open_interventions().len(), 1);
    assert!(engine.events().len() >= events_before);
}

#[test]
fn confirmed_supply_flows_through_to_the_customer() {
    let engine = engine();
    engine
        .on_order_confirmed(&sale(vec![OrderLineRef::new(1, "WIDGET", 10)]))
        .unwrap();
    let po = engine.purchase_orders()[0].id_typed();

    let outcome = engine.confirm_purchase_order(po).unwrap();
    assert_eq!(outcome.assigned.len(), 1);
    let receipt = engine.move_by_id(outcome.assigned[0]).unwrap();
    assert_eq!(receipt.status, MoveStatus::Assigned);

    finish_move(&engine, &receipt);
    assert_eq!(level(&engine, "WIDGET", "L01").on_hand, 10);
    assert_eq!(level(&engine, "WIDGET", "L01").reserved, 10);
    assert!(engine.open_interventions().is_empty());

    let shipment = moves_in(&engine, MoveStatus::Assigned);
    assert_eq!(shipment.len(), 1);
    finish_move(&engine, &shipment[0]);

    assert_eq!(level(&engine, "WIDGET", "L01").on_hand, 0);
    assert_eq!(level(&engine, "WIDGET", "L09").on_hand, 10);
    for trigger in engine.triggers() {
        assert_eq!(trigger.status, TriggerStatus::Resolved);
        assert_eq!(trigger.done_quantity, trigger.quantity);
    }
    assert_eq!(moves_in(&engine, MoveStatus::Done).len(), 2);
}

#[test]
fn auto_confirmed_supply_assigns_the_receipt_right_away() {
    let config = EngineConfig {
        auto_confirm_supply: true,
        ..EngineConfig::default()
    };
    let engine = engine_with(config, catalog());

    let outcome = engine
        .on_order_confirmed(&sale(vec![OrderLineRef::new(1, "WIDGET", 4)]))
        .unwrap();

    assert_eq!(engine.purchase_orders()[0].status(), PurchaseOrderStatus::Confirmed);
    assert_eq!(outcome.assigned.len(), 1);
    assert_eq!(moves_in(&engine, MoveStatus::Intervene).len(), 1);
}

#[test]
fn manufacturing_order_explodes_its_bom_into_purchase_lines() {
    let engine = engine();
    let (mo, _) = engine.create_manufacturing_order("GADGET", 5).unwrap();

    engine.confirm_manufacturing_order(mo).unwrap();

    let mut demand: Vec<(String, i64)> = engine
        .purchase_orders()
        .iter()
        .flat_map(|po| po.lines().iter().map(|l| (l.item.to_string(), l.quantity)))
        .collect();
    demand.sort();
    assert_eq!(demand, vec![("COMP-A".to_string(), 10), ("COMP-B".to_string(), 5)]);
    assert_eq!(engine.purchase_orders().len(), 2);

    // Components have not arrived yet.
    match engine.complete_manufacturing_order(mo) {
        Err(DomainError::Validation(msg)) => assert!(msg.contains("insufficient")),
        other => panic!("Expected validation error, got {other:?}"),
    }

    for po in engine.purchase_orders() {
        engine.confirm_purchase_order(po.id_typed()).unwrap();
    }
    let deliveries: Vec<_> = moves_in(&engine, MoveStatus::Assigned)
        .into_iter()
        .filter(|m| m.role == MoveRole::Supply)
        .collect();
    assert_eq!(deliveries.len(), 2);
    for mv in &deliveries {
        finish_move(&engine, mv);
    }
    assert_eq!(level(&engine, "COMP-A", "L07").on_hand, 10);

    engine.complete_manufacturing_order(mo).unwrap();
    assert_eq!(level(&engine, "GADGET", "L07").on_hand, 5);
    assert_eq!(level(&engine, "COMP-A", "L07").on_hand, 0);
    assert_eq!(level(&engine, "COMP-B", "L07").on_hand, 0);
}

#[test]
fn stock_correction_assigns_the_waiting_move_and_nothing_else() {
    let engine = engine();
    engine
        .on_order_confirmed(&sale(vec![
            OrderLineRef::new(1, "WIDGET", 5).with_route("PICKING"),
            OrderLineRef::new(2, "GIZMO", 2).with_route("PICKING"),
        ]))
        .unwrap();
    assert_eq!(moves_in(&engine, MoveStatus::Intervene).len(), 2);
    assert_eq!(engine.open_interventions().len(), 2);

    let outcome = engine.adjust_stock(&adjustment("WIDGET", "L02", 5)).unwrap();

    assert_eq!(outcome.assigned.len(), 1);
    assert_eq!(outcome.resolved_interventions.len(), 1);
    let widget = engine.move_by_id(outcome.assigned[0]).unwrap();
    assert_eq!(widget.item.as_str(), "WIDGET");
    assert_eq!(widget.status, MoveStatus::Assigned);

    let still_waiting = moves_in(&engine, MoveStatus::Intervene);
    assert_eq!(still_waiting.len(), 1);
    assert_eq!(still_waiting[0].item.as_str(), "GIZMO");
    assert_eq!(engine.open_interventions().len(), 1);
    assert_eq!(level(&engine, "WIDGET", "L02").reserved, 5);
}

#[test]
fn stock_correction_drops_the_upstream_purchase_it_made_unnecessary() {
    let engine = engine();
    let confirmed = sale(vec![OrderLineRef::new(1, "WIDGET", 10)]);
    engine.on_order_confirmed(&confirmed).unwrap();
    assert_eq!(engine.purchase_orders()[0].total_quantity(), 10);

    let outcome = engine.adjust_stock(&adjustment("WIDGET", "L01", 10)).unwrap();

    assert_eq!(outcome.assigned.len(), 1);
    let shipment = engine.move_by_id(outcome.assigned[0]).unwrap();
    assert_eq!(shipment.source_zone.as_str(), "ZON01");
    assert_eq!(level(&engine, "WIDGET", "L01").reserved, 10);

    let pending: Vec<String> = engine
        .triggers()
        .into_iter()
        .filter(|t| t.status == TriggerStatus::Pending)
        .map(|t| t.target_zone.as_str().to_string())
        .collect();
    assert_eq!(pending, vec!["ZON09".to_string()]);

    let po = &engine.purchase_orders()[0];
    assert_eq!(po.status(), PurchaseOrderStatus::Cancelled);
    assert!(po.lines().is_empty());
    assert!(moves_in(&engine, MoveStatus::Draft).is_empty());
    assert!(engine.open_interventions().is_empty());
}

#[test]
fn confirmed_upstream_supply_survives_a_stock_correction() {
    let engine = engine();
    engine
        .on_order_confirmed(&sale(vec![OrderLineRef::new(1, "WIDGET", 10)]))
        .unwrap();
    let po = engine.purchase_orders()[0].id_typed();
    engine.confirm_purchase_order(po).unwrap();

    engine.adjust_stock(&adjustment("WIDGET", "L01", 10)).unwrap();

    assert!(engine.triggers().iter().all(|t| t.status == TriggerStatus::Pending));
    assert_eq!(engine.purchase_order(po).unwrap().status(), PurchaseOrderStatus::Confirmed);
    let assigned = moves_in(&engine, MoveStatus::Assigned);
    assert_eq!(assigned.len(), 2);
    assert!(assigned.iter().any(|m| m.source_zone.as_str() == "ZON08"));
}

#[test]
fn competing_shortages_are_served_oldest_first() {
    let engine = engine();
    let older = sale(vec![OrderLineRef::new(1, "WIDGET", 5).with_route("PICKING")]);
    let newer = sale(vec![OrderLineRef::new(1, "WIDGET", 5).with_route("PICKING")]);
    engine.on_order_confirmed(&older).unwrap();
    engine.on_order_confirmed(&newer).unwrap();
    assert_eq!(engine.open_interventions().len(), 2);

    let demand_of = |order: &wms_events::integration::OrderConfirmed| {
        let trigger = engine.triggers_for(OriginModel::SaleOrder, order.origin_id).remove(0);
        engine.moves_of(trigger.id).remove(0)
    };
    let lined = |mv: &wms_fulfillment::Move| -> i64 {
        engine.move_lines_of(mv.id).iter().map(|l| l.quantity).sum()
    };

    engine.adjust_stock(&adjustment("WIDGET", "L02", 3)).unwrap();
    let first = demand_of(&older);
    let second = demand_of(&newer);
    assert_eq!(lined(&first), 3);
    assert_eq!(first.status, MoveStatus::Intervene);
    assert_eq!(lined(&second), 0);
    assert_eq!(second.status, MoveStatus::Intervene);

    engine.adjust_stock(&adjustment("WIDGET", "L02", 5)).unwrap();
    let first = demand_of(&older);
    let second = demand_of(&newer);
    assert_eq!(first.status, MoveStatus::Assigned);
    assert_eq!(lined(&first), 5);
    assert_eq!(second.status, MoveStatus::Intervene);
    assert_eq!(lined(&second), 3);
    assert_eq!(level(&engine, "WIDGET", "L02").reserved, 8);

    let open = engine.open_interventions();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].move_id, second.id);
    assert_eq!(open[0].shortfall, 2);
}

#[test]
fn partial_stock_is_reserved_and_topped_up_into_the_same_line() {
    let engine = engine();
    engine.adjust_stock(&adjustment("WIDGET", "L02", 3)).unwrap();
    engine
        .on_order_confirmed(&sale(vec![OrderLineRef::new(1, "WIDGET", 5).with_route("PICKING")]))
        .unwrap();

    let mv = moves_in(&engine, MoveStatus::Intervene).remove(0);
    assert_eq!(engine.move_lines_of(mv.id)[0].quantity, 3);
    assert_eq!(engine.open_interventions()[0].shortfall, 2);

    // Lines of a move that is still short cannot be completed.
    let line = engine.move_lines_of(mv.id)[0].id;
    match engine.mark_move_line_done(line) {
        Err(DomainError::InvariantViolation(_)) => {}
        other => panic!("Expected invariant violation, got {other:?}"),
    }

    engine.adjust_stock(&adjustment("WIDGET", "L02", 2)).unwrap();
    let lines = engine.move_lines_of(mv.id);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 5);
    assert_eq!(engine.move_by_id(mv.id).unwrap().status, MoveStatus::Assigned);
    assert_eq!(engine.interventions()[0].status, InterventionStatus::Resolved);
}

#[test]
fn progress_never_exceeds_the_trigger_quantity() {
    let engine = engine();
    engine.adjust_stock(&adjustment("WIDGET", "L01", 5)).unwrap();
    let confirmed = sale(vec![OrderLineRef::new(1, "WIDGET", 5)]);
    engine.on_order_confirmed(&confirmed).unwrap();
    let mv = moves_in(&engine, MoveStatus::Assigned).remove(0);
    let line = engine.move_lines_of(mv.id)[0].id;

    engine.record_move_line_progress(line, 2).unwrap();
    let trigger = &engine.triggers_for(OriginModel::SaleOrder, confirmed.origin_id)[0];
    assert_eq!(trigger.done_quantity, 2);
    assert_eq!(trigger.status, TriggerStatus::Pending);

    match engine.record_move_line_progress(line, 4) {
        Err(DomainError::Validation(_)) => {}
        other => panic!("Expected validation error, got {other:?}"),
    }

    engine.record_move_line_progress(line, 3).unwrap();
    let trigger = &engine.triggers_for(OriginModel::SaleOrder, confirmed.origin_id)[0];
    assert_eq!(trigger.done_quantity, 5);
    assert_eq!(trigger.status, TriggerStatus::Resolved);

    // Replaying the completion is harmless.
    engine.mark_move_line_done(line).unwrap();
    assert_eq!(level(&engine, "WIDGET", "L09").on_hand, 5);
}

#[test]
fn pull_or_buy_buys_only_the_shortfall() {
    let engine = engine();
    engine.adjust_stock(&adjustment("WIDGET", "L01", 4)).unwrap();

    let outcome = engine
        .on_order_confirmed(&sale(vec![OrderLineRef::new(1, "WIDGET", 10).with_route("DIRECT")]))
        .unwrap();
    assert!(outcome.is_pending());
    assert_eq!(engine.purchase_orders()[0].total_quantity(), 6);

    let companion: Vec<_> = engine
        .moves()
        .into_iter()
        .filter(|m| m.role == MoveRole::Supply)
        .collect();
    assert_eq!(companion.len(), 1);
    assert_eq!(companion[0].status, MoveStatus::Draft);
    assert_eq!(companion[0].quantity, 6);

    engine
        .confirm_purchase_order(engine.purchase_orders()[0].id_typed())
        .unwrap();
    let companion = engine.move_by_id(companion[0].id).unwrap();
    assert_eq!(companion.status, MoveStatus::Assigned);
    finish_move(&engine, &companion);

    let demand = moves_in(&engine, MoveStatus::Assigned);
    assert_eq!(demand.len(), 1);
    assert_eq!(demand[0].role, MoveRole::Demand);
    assert_eq!(engine.move_lines_of(demand[0].id)[0].quantity, 10);
    finish_move(&engine, &demand[0]);
    assert_eq!(engine.triggers()[0].status, TriggerStatus::Resolved);
}

#[test]
fn routing_cycle_is_rejected_without_leaving_anything_behind() {
    let engine = engine();
    engine.adjust_stock(&adjustment("WIDGET", "L02", 1)).unwrap();
    let events_before = engine.events().len();

    let result = engine.on_order_confirmed(&sale(vec![OrderLineRef::new(1, "WIDGET", 3).with_route("LOOP")]));

    match result {
        Err(DomainError::Configuration(msg)) => assert!(msg.contains("routing cycle")),
        other => panic!("Expected configuration error, got {other:?}"),
    }
    assert!(engine.triggers().is_empty());
    assert!(engine.moves().is_empty());
    assert_eq!(level(&engine, "WIDGET", "L02").reserved, 0);
    assert_eq!(engine.events().len(), events_before);
}

#[test]
fn missing_rule_aborts_the_whole_order() {
    let engine = engine();
    engine.adjust_stock(&adjustment("WIDGET", "L01", 5)).unwrap();

    let result = engine.on_order_confirmed(&sale(vec![
        OrderLineRef::new(1, "WIDGET", 5),
        OrderLineRef::new(2, "WIDGET", 1).with_route("RECEIPTS"),
    ]));

    match result {
        Err(DomainError::Configuration(msg)) => assert!(msg.contains("no route")),
        other => panic!("Expected configuration error, got {other:?}"),
    }
    assert!(engine.triggers().is_empty());
    assert_eq!(level(&engine, "WIDGET", "L01").reserved, 0);
}

#[test]
fn malformed_orders_are_rejected() {
    let engine = engine();
    for lines in [
        vec![],
        vec![OrderLineRef::new(1, "WIDGET", 0)],
        vec![OrderLineRef::new(1, "WIDGET", 1), OrderLineRef::new(1, "GIZMO", 1)],
    ] {
        match engine.on_order_confirmed(&sale(lines)) {
            Err(DomainError::Validation(_)) => {}
            other => panic!("Expected validation error, got {other:?}"),
        }
    }
    match engine.on_order_confirmed(&common::order(
        OriginModel::TransferOrder,
        vec![OrderLineRef::new(1, "WIDGET", 1)],
    )) {
        Err(DomainError::Validation(msg)) => assert!(msg.contains("target zone")),
        other => panic!("Expected validation error, got {other:?}"),
    }
}

#[test]
fn transfer_lines_use_their_own_destination() {
    let engine = engine();
    engine.adjust_stock(&adjustment("WIDGET", "L01", 2)).unwrap();

    engine
        .on_order_confirmed(&common::order(
            OriginModel::TransferOrder,
            vec![OrderLineRef::new(1, "WIDGET", 2).with_target_zone("ZON02")],
        ))
        .unwrap();

    let mv = moves_in(&engine, MoveStatus::Assigned).remove(0);
    assert_eq!(mv.target_zone.as_str(), "ZON02");
    finish_move(&engine, &mv);
    assert_eq!(level(&engine, "WIDGET", "L02").on_hand, 2);
}

#[test]
fn cancelling_an_order_releases_stock_and_shrinks_its_supply() {
    let engine = engine();
    engine.adjust_stock(&adjustment("WIDGET", "L01", 4)).unwrap();
    let first = sale(vec![OrderLineRef::new(1, "WIDGET", 10)]);
    let second = sale(vec![OrderLineRef::new(1, "WIDGET", 3)]);
    engine.on_order_confirmed(&first).unwrap();
    engine.on_order_confirmed(&second).unwrap();
    assert_eq!(engine.purchase_orders().len(), 1);
    assert_eq!(engine.purchase_orders()[0].total_quantity(), 9);
    assert_eq!(level(&engine, "WIDGET", "L01").reserved, 4);

    engine.on_order_cancelled(&cancellation(&first)).unwrap();

    for trigger in engine.triggers_for(OriginModel::SaleOrder, first.origin_id) {
        assert_eq!(trigger.status, TriggerStatus::Cancelled);
    }

    // The freed units go to the second order, whose own upstream purchase is dropped.
    let demand = engine
        .moves()
        .into_iter()
        .find(|m| {
            m.role == MoveRole::Demand
                && m.source_zone.as_str() == "ZON01"
                && engine
                    .trigger(m.trigger.unwrap())
                    .is_some_and(|t| t.origin.id == second.origin_id)
        })
        .unwrap();
    assert_eq!(demand.status, MoveStatus::Assigned);
    assert_eq!(level(&engine, "WIDGET", "L01").reserved, 3);

    let mut second_triggers: Vec<(String, TriggerStatus)> = engine
        .triggers_for(OriginModel::SaleOrder, second.origin_id)
        .into_iter()
        .map(|t| (t.target_zone.as_str().to_string(), t.status))
        .collect();
    second_triggers.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        second_triggers,
        vec![
            ("ZON01".to_string(), TriggerStatus::Cancelled),
            ("ZON09".to_string(), TriggerStatus::Pending),
        ]
    );

    let po = &engine.purchase_orders()[0];
    assert_eq!(po.total_quantity(), 0);
    assert_eq!(po.status(), PurchaseOrderStatus::Cancelled);
    let count = |status| {
        engine
            .interventions()
            .iter()
            .filter(|i| i.status == status)
            .count()
    };
    assert_eq!(count(InterventionStatus::Cancelled), 1);
    assert_eq!(count(InterventionStatus::Resolved), 1);
    assert!(engine.open_interventions().is_empty());

    // Cancelling again changes nothing.
    let again = engine.on_order_cancelled(&cancellation(&first)).unwrap();
    assert!(again.moves.is_empty());
}

#[test]
fn cancelling_the_only_demand_cancels_the_emptied_purchase_order() {
    let engine = engine();
    let confirmed = sale(vec![OrderLineRef::new(1, "WIDGET", 7)]);
    engine.on_order_confirmed(&confirmed).unwrap();

    engine.on_order_cancelled(&cancellation(&confirmed)).unwrap();

    let po = &engine.purchase_orders()[0];
    assert_eq!(po.status(), PurchaseOrderStatus::Cancelled);
    assert!(moves_in(&engine, MoveStatus::Cancelled).len() >= 2);
}
