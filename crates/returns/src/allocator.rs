use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, ItemCode, LotCode};

use crate::origin::{OriginOrder, OriginOrderStatus};

/// One line of a return request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequestLine {
    pub item: ItemCode,
    #[serde(default)]
    pub lot: Option<LotCode>,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ReturnRequestLine {
    pub fn new(item: impl Into<ItemCode>, quantity: i64) -> Self {
        Self {
            item: item.into(),
            lot: None,
            quantity,
            reason: None,
        }
    }

    pub fn with_lot(mut self, lot: impl Into<LotCode>) -> Self {
        self.lot = Some(lot.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Refund computed for one requested line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundAllocation {
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
    pub reason: Option<String>,
    pub unit_price: Decimal,
    pub base_refund: Decimal,
    pub tax: Decimal,
    pub refund_amount: Decimal,
    pub currency: Option<String>,
    pub tax_id: Option<String>,
    pub discount_id: Option<String>,
}

/// Validates a return request against its origin and computes per-line refunds.
///
/// `already_returned` reports the quantity of `(item, lot)` held by earlier returns on the
/// same origin. Any invalid line rejects the whole request.
pub fn allocate<F>(
    origin: &OriginOrder,
    already_returned: F,
    lines: &[ReturnRequestLine],
) -> DomainResult<Vec<RefundAllocation>>
where
    F: Fn(&ItemCode, Option<&LotCode>) -> i64,
{
    if origin.status != OriginOrderStatus::Confirmed {
        return Err(DomainError::validation(format!(
            "origin order {} is not confirmed",
            origin.code
        )));
    }
    if lines.is_empty() {
        return Err(DomainError::validation("return order has no lines"));
    }

    // Lines of one request that hit the same (item, lot) share the remaining quantity.
    let mut requested: BTreeMap<(&ItemCode, Option<&LotCode>), i64> = BTreeMap::new();
    for line in lines {
        if line.quantity < 1 {
            return Err(DomainError::validation(format!(
                "return quantity for {} must be at least 1",
                line.item
            )));
        }
        let Some((origin_qty, _)) = origin.returnable(&line.item, line.lot.as_ref()) else {
            return Err(DomainError::validation(format!(
                "item {}{} is not part of origin order {}",
                line.item,
                lot_suffix(line.lot.as_ref()),
                origin.code
            )));
        };

        let total = requested
            .entry((&line.item, line.lot.as_ref()))
            .or_insert(0);
        *total += line.quantity;

        let remaining = origin_qty - already_returned(&line.item, line.lot.as_ref());
        if *total > remaining {
            return Err(DomainError::validation(format!(
                "return quantity {} of {}{} exceeds remaining returnable quantity {}",
                total,
                line.item,
                lot_suffix(line.lot.as_ref()),
                remaining.max(0)
            )));
        }
    }

    let discount_per_unit = origin.discount_per_unit();
    let allocations = lines
        .iter()
        .filter_map(|line| {
            let (_, origin_line) = origin.returnable(&line.item, line.lot.as_ref())?;
            let quantity = Decimal::from(line.quantity);
            let base_refund = origin_line.unit_price * quantity - discount_per_unit * quantity;
            let tax = base_refund * origin.tax_percent / Decimal::ONE_HUNDRED;
            Some(RefundAllocation {
                item: line.item.clone(),
                lot: line.lot.clone(),
                quantity: line.quantity,
                reason: line.reason.clone(),
                unit_price: origin_line.unit_price,
                base_refund,
                tax,
                refund_amount: base_refund + tax,
                currency: origin_line.currency.clone(),
                tax_id: origin.tax_id.clone(),
                discount_id: origin.discount_id.clone(),
            })
        })
        .collect();
    Ok(allocations)
}

fn lot_suffix(lot: Option<&LotCode>) -> String {
    lot.map(|l| format!(" (lot {l})")).unwrap_or_default()
}
