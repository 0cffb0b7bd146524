mod common;

use std::collections::BTreeMap;

use proptest::prelude::*;

use wms_events::integration::{OrderConfirmed, OrderLineRef};
use wms_fulfillment::{FulfillmentEngine, MoveStatus, TriggerStatus};
use wms_inventory::StockKey;
use wms_purchasing::PurchaseOrderStatus;

use common::*;

const ITEMS: [&str; 2] = ["WIDGET", "GIZMO"];
const LOCATIONS: [&str; 2] = ["L01", "L02"];
const ROUTES: [&str; 3] = ["SALES", "PICKING", "DIRECT"];

#[derive(Debug, Clone)]
enum Op {
    Adjust { item: usize, location: usize, delta: i64 },
    Sell { item: usize, quantity: i64, route: usize },
    Complete { pick: usize },
    Cancel { pick: usize },
    ConfirmSupply,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ITEMS.len(), 0..LOCATIONS.len(), -6i64..12).prop_map(|(item, location, delta)| Op::Adjust {
            item,
            location,
            delta
        }),
        (0..ITEMS.len(), 1i64..8, 0..ROUTES.len()).prop_map(|(item, quantity, route)| Op::Sell {
            item,
            quantity,
            route
        }),
        (0usize..16).prop_map(|pick| Op::Complete { pick }),
        (0usize..8).prop_map(|pick| Op::Cancel { pick }),
        Just(Op::ConfirmSupply),
    ]
}

fn apply(engine: &FulfillmentEngine, orders: &mut Vec<OrderConfirmed>, op: &Op) {
    // Rejected operations are fine; they must just leave a consistent engine behind.
    match op {
        Op::Adjust { item, location, delta } => {
            let _ = engine.adjust_stock(&adjustment(ITEMS[*item], LOCATIONS[*location], *delta));
        }
        Op::Sell { item, quantity, route } => {
            let confirmed = sale(vec![
                OrderLineRef::new(1, ITEMS[*item], *quantity).with_route(ROUTES[*route]),
            ]);
            if engine.on_order_confirmed(&confirmed).is_ok() {
                orders.push(confirmed);
            }
        }
        Op::Complete { pick } => {
            let open: Vec<_> = moves_in(engine, MoveStatus::Assigned)
                .iter()
                .flat_map(|m| engine.move_lines_of(m.id))
                .filter(|l| !l.is_done())
                .collect();
            if !open.is_empty() {
                let _ = engine.mark_move_line_done(open[pick % open.len()].id);
            }
        }
        Op::Cancel { pick } => {
            if !orders.is_empty() {
                let _ = engine.on_order_cancelled(&cancellation(&orders[pick % orders.len()]));
            }
        }
        Op::ConfirmSupply => {
            if let Some(po) = engine
                .purchase_orders()
                .into_iter()
                .find(|po| po.status() == PurchaseOrderStatus::Draft)
            {
                let _ = engine.confirm_purchase_order(po.id_typed());
            }
        }
    }
}

fn assert_consistent(engine: &FulfillmentEngine) {
    let snapshot = engine.ledger().snapshot();
    for (key, level) in &snapshot {
        assert!(level.on_hand >= 0, "{key} went negative: {level:?}");
        assert!(level.reserved >= 0 && level.reserved <= level.on_hand, "{key}: {level:?}");
    }

    // Reservations in the ledger are exactly what live move lines still hold.
    let mut held: BTreeMap<StockKey, i64> = BTreeMap::new();
    for mv in engine.moves().iter().filter(|m| !m.status.is_terminal()) {
        let lines = engine.move_lines_of(mv.id);
        let lined: i64 = lines.iter().map(|l| l.quantity).sum();
        assert!(lined <= mv.quantity, "move {} over-planned", mv.id);
        for line in lines.iter().filter(|l| l.reserved) {
            *held
                .entry(StockKey::new(line.item.clone(), line.source_location.clone(), line.lot.clone()))
                .or_insert(0) += line.remaining();
        }
    }
    for (key, level) in &snapshot {
        assert_eq!(level.reserved, held.get(key).copied().unwrap_or(0), "reservation drift at {key}");
    }

    for trigger in engine.triggers() {
        assert!(trigger.done_quantity <= trigger.quantity);
        if trigger.status == TriggerStatus::Resolved {
            assert_eq!(trigger.done_quantity, trigger.quantity);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_interleavings_keep_stock_consistent(ops in prop::collection::vec(op(), 1..40)) {
        let engine = engine();
        let mut orders = Vec::new();
        for op in &ops {
            apply(&engine, &mut orders, op);
            assert_consistent(&engine);
        }
    }
}
