use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::info;

use wms_core::{AggregateId, DomainError, DomainResult, ItemCode, LotCode};
use wms_events::integration::{OrderConfirmed, OrderLineRef, OriginModel};

use crate::allocator::{ReturnRequestLine, allocate};
use crate::order::{ReturnOrder, ReturnOrderId};
use crate::origin::{OriginOrder, ReturnOrigin};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ReturnedKey {
    origin: ReturnOrigin,
    origin_id: AggregateId,
    item: ItemCode,
    lot: Option<LotCode>,
}

/// Return orders plus the running per-(origin, item, lot) returned-quantity counters.
///
/// Counters move together with the order they belong to: creating a return adds its
/// quantities, cancelling it gives them back.
#[derive(Debug, Clone, Default)]
pub struct ReturnRegistry {
    orders: BTreeMap<ReturnOrderId, ReturnOrder>,
    returned: HashMap<ReturnedKey, i64>,
}

impl ReturnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ReturnOrderId) -> Option<&ReturnOrder> {
        self.orders.get(&id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &ReturnOrder> {
        self.orders.values()
    }

    pub fn orders_for_origin(&self, origin_id: AggregateId) -> impl Iterator<Item = &ReturnOrder> {
        self.orders.values().filter(move |o| o.origin_id() == origin_id)
    }

    pub fn returned_quantity(
        &self,
        origin: ReturnOrigin,
        origin_id: AggregateId,
        item: &ItemCode,
        lot: Option<&LotCode>,
    ) -> i64 {
        let key = ReturnedKey {
            origin,
            origin_id,
            item: item.clone(),
            lot: lot.cloned(),
        };
        self.returned.get(&key).copied().unwrap_or(0)
    }

    /// Validates and records a draft return. Nothing is stored when validation fails.
    pub fn create(
        &mut self,
        id: ReturnOrderId,
        origin: &OriginOrder,
        lines: &[ReturnRequestLine],
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<&ReturnOrder> {
        if self.orders.contains_key(&id) {
            return Err(DomainError::conflict(format!("return order {id} already exists")));
        }
        let allocations = allocate(
            origin,
            |item, lot| self.returned_quantity(origin.model, origin.id, item, lot),
            lines,
        )?;

        let order = ReturnOrder::draft(
            id,
            origin.model,
            origin.id,
            origin.code.clone(),
            origin.partner.clone(),
            allocations,
            occurred_at,
        );
        for line in order.lines() {
            *self.returned.entry(key_for(&order, &line.item, line.lot.as_ref())).or_insert(0) +=
                line.quantity;
        }
        info!(
            return_order = %order.code(),
            origin = %origin.code,
            lines = order.lines().len(),
            refund = %order.total_refund(),
            "return order created"
        );
        Ok(self.orders.entry(id).or_insert(order))
    }

    /// Confirms a draft return and returns the event that routes the goods back in.
    pub fn confirm(
        &mut self,
        id: ReturnOrderId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<OrderConfirmed> {
        let order = self.order_mut(id)?;
        order.confirm()?;
        info!(return_order = %order.code(), "return order confirmed");
        Ok(OrderConfirmed {
            origin_model: OriginModel::ReturnOrder,
            origin_id: id.0,
            lines: order
                .lines()
                .iter()
                .map(|l| OrderLineRef {
                    line_no: l.line_no,
                    item: l.item.clone(),
                    lot: l.lot.clone(),
                    quantity: l.quantity,
                    target_zone: None,
                    route: None,
                })
                .collect(),
            occurred_at,
        })
    }

    pub fn mark_done(&mut self, id: ReturnOrderId) -> DomainResult<()> {
        self.order_mut(id)?.mark_done()
    }

    /// Cancels the return and gives its quantities back to the origin.
    pub fn cancel(&mut self, id: ReturnOrderId) -> DomainResult<()> {
        let order = self.order_mut(id)?;
        order.cancel()?;

        let released: Vec<_> = order
            .lines()
            .iter()
            .map(|l| (key_for(order, &l.item, l.lot.as_ref()), l.quantity))
            .collect();
        for (key, quantity) in released {
            if let Some(counter) = self.returned.get_mut(&key) {
                *counter -= quantity;
                if *counter <= 0 {
                    self.returned.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn order_mut(&mut self, id: ReturnOrderId) -> DomainResult<&mut ReturnOrder> {
        self.orders
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("return order {id}")))
    }
}

fn key_for(order: &ReturnOrder, item: &ItemCode, lot: Option<&LotCode>) -> ReturnedKey {
    ReturnedKey {
        origin: order.origin(),
        origin_id: order.origin_id(),
        item: item.clone(),
        lot: lot.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::ReturnOrderStatus;
    use crate::origin::{OriginLine, OriginOrderStatus};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use wms_core::PartyCode;

    fn sale(quantity: i64) -> OriginOrder {
        OriginOrder {
            model: ReturnOrigin::SaleOrder,
            id: AggregateId::new(),
            code: "SO-0042".to_string(),
            partner: PartyCode::from("CUST-7"),
            status: OriginOrderStatus::Confirmed,
            lines: vec![OriginLine {
                item: ItemCode::from("SKU-A"),
                lot: None,
                quantity,
                unit_price: dec!(12.50),
                currency: Some("EUR".to_string()),
            }],
            discount: Decimal::ZERO,
            discount_id: None,
            tax_percent: dec!(10),
            tax_id: Some("VAT10".to_string()),
        }
    }

    fn new_id() -> ReturnOrderId {
        ReturnOrderId::new(AggregateId::new())
    }

    #[test]
    fn over_return_is_rejected_with_nothing_persisted() {
        let origin = sale(5);
        let mut registry = ReturnRegistry::new();
        registry
            .create(new_id(), &origin, &[ReturnRequestLine::new("SKU-A", 3)], Utc::now())
            .unwrap();

        let rejected = new_id();
        let err = registry
            .create(rejected, &origin, &[ReturnRequestLine::new("SKU-A", 3)], Utc::now())
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert!(registry.get(rejected).is_none());
        assert_eq!(registry.orders_for_origin(origin.id).count(), 1);
        assert_eq!(
            registry.returned_quantity(origin.model, origin.id, &ItemCode::from("SKU-A"), None),
            3
        );
    }

    #[test]
    fn cancelling_a_return_releases_its_quantity() {
        let origin = sale(5);
        let mut registry = ReturnRegistry::new();
        let first = new_id();
        registry
            .create(first, &origin, &[ReturnRequestLine::new("SKU-A", 5)], Utc::now())
            .unwrap();
        registry.cancel(first).unwrap();

        assert_eq!(
            registry.returned_quantity(origin.model, origin.id, &ItemCode::from("SKU-A"), None),
            0
        );
        assert!(
            registry
                .create(new_id(), &origin, &[ReturnRequestLine::new("SKU-A", 5)], Utc::now())
                .is_ok()
        );
    }

    #[test]
    fn confirming_emits_a_return_order_confirmation() {
        let origin = sale(5);
        let mut registry = ReturnRegistry::new();
        let id = new_id();
        let refund = registry
            .create(id, &origin, &[ReturnRequestLine::new("SKU-A", 2)], Utc::now())
            .unwrap()
            .total_refund();
        assert_eq!(refund, dec!(27.5));

        let event = registry.confirm(id, Utc::now()).unwrap();
        assert_eq!(event.origin_model, OriginModel::ReturnOrder);
        assert_eq!(event.origin_id, id.0);
        assert_eq!(event.lines, vec![OrderLineRef::new(1, "SKU-A", 2)]);

        registry.mark_done(id).unwrap();
        assert_eq!(registry.get(id).unwrap().status(), ReturnOrderStatus::Done);
        // Done returns keep holding their quantity.
        assert!(
            registry
                .create(new_id(), &origin, &[ReturnRequestLine::new("SKU-A", 4)], Utc::now())
                .is_err()
        );
    }

    #[test]
    fn duplicate_ids_and_unknown_orders_are_reported() {
        let origin = sale(5);
        let mut registry = ReturnRegistry::new();
        let id = new_id();
        registry
            .create(id, &origin, &[ReturnRequestLine::new("SKU-A", 1)], Utc::now())
            .unwrap();

        assert!(matches!(
            registry.create(id, &origin, &[ReturnRequestLine::new("SKU-A", 1)], Utc::now()),
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(registry.confirm(new_id(), Utc::now()), Err(DomainError::NotFound(_))));
    }
}
