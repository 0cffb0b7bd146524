use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wms_core::{AggregateId, ItemCode, LotCode, PartyCode};
use wms_events::integration::OriginModel;

/// Which kind of order goods are returned against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnOrigin {
    SaleOrder,
    PurchaseOrder,
}

impl From<ReturnOrigin> for OriginModel {
    fn from(value: ReturnOrigin) -> Self {
        match value {
            ReturnOrigin::SaleOrder => OriginModel::SaleOrder,
            ReturnOrigin::PurchaseOrder => OriginModel::PurchaseOrder,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginOrderStatus {
    Draft,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginLine {
    pub item: ItemCode,
    #[serde(default)]
    pub lot: Option<LotCode>,
    pub quantity: i64,
    pub unit_price: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Snapshot of the order a return refers to, as supplied by the order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginOrder {
    pub model: ReturnOrigin,
    pub id: AggregateId,
    pub code: String,
    pub partner: PartyCode,
    pub status: OriginOrderStatus,
    pub lines: Vec<OriginLine>,
    /// Order-level discount amount.
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub discount_id: Option<String>,
    /// Tax rate in percent (e.g. `21` for 21%).
    #[serde(default)]
    pub tax_percent: Decimal,
    #[serde(default)]
    pub tax_id: Option<String>,
}

impl OriginOrder {
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum()
    }

    /// Net amount after discount, before tax.
    pub fn net(&self) -> Decimal {
        self.subtotal() - self.discount
    }

    pub fn tax(&self) -> Decimal {
        self.net() * self.tax_percent / Decimal::ONE_HUNDRED
    }

    /// Gross amount the customer paid (or the vendor billed).
    pub fn total(&self) -> Decimal {
        self.net() + self.tax()
    }

    /// Per-unit share of the order discount (0 without discount or quantity).
    pub fn discount_per_unit(&self) -> Decimal {
        let total_qty = self.total_quantity();
        if self.discount.is_zero() || total_qty <= 0 {
            return Decimal::ZERO;
        }
        self.discount / Decimal::from(total_qty)
    }

    /// Returnable quantity and origin line for `(item, lot)`.
    ///
    /// Several origin lines with the same key are pooled; pricing follows the first one.
    pub fn returnable(&self, item: &ItemCode, lot: Option<&LotCode>) -> Option<(i64, &OriginLine)> {
        let mut matching = self
            .lines
            .iter()
            .filter(|l| &l.item == item && l.lot.as_ref() == lot);
        let first = matching.next()?;
        let quantity = first.quantity + matching.map(|l| l.quantity).sum::<i64>();
        Some((quantity, first))
    }
}
