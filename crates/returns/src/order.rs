use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wms_core::{AggregateId, AggregateRoot, DomainError, DomainResult, ItemCode, LotCode, PartyCode};

use crate::allocator::RefundAllocation;
use crate::origin::ReturnOrigin;

/// Return order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReturnOrderId(pub AggregateId);

impl ReturnOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ReturnOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnOrderStatus {
    Draft,
    Confirmed,
    Cancelled,
    Done,
}

impl ReturnOrderStatus {
    /// Whether the order still holds returnable quantity of its origin.
    pub fn counts_against_origin(&self) -> bool {
        !matches!(self, ReturnOrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLine {
    pub line_no: u32,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
    pub reason: Option<String>,
    pub unit_price: Decimal,
    pub refund_amount: Decimal,
    pub tax: Decimal,
    pub currency: Option<String>,
    pub tax_id: Option<String>,
    pub discount_id: Option<String>,
}

impl ReturnLine {
    fn from_allocation(line_no: u32, allocation: RefundAllocation) -> Self {
        Self {
            line_no,
            item: allocation.item,
            lot: allocation.lot,
            quantity: allocation.quantity,
            reason: allocation.reason,
            unit_price: allocation.unit_price,
            refund_amount: allocation.refund_amount,
            tax: allocation.tax,
            currency: allocation.currency,
            tax_id: allocation.tax_id,
            discount_id: allocation.discount_id,
        }
    }
}

/// A customer (or vendor) return against a confirmed origin order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnOrder {
    id: ReturnOrderId,
    code: String,
    origin: ReturnOrigin,
    origin_id: AggregateId,
    origin_code: String,
    partner: PartyCode,
    status: ReturnOrderStatus,
    lines: Vec<ReturnLine>,
    created_at: DateTime<Utc>,
    version: u64,
}

impl ReturnOrder {
    pub(crate) fn draft(
        id: ReturnOrderId,
        origin: ReturnOrigin,
        origin_id: AggregateId,
        origin_code: String,
        partner: PartyCode,
        allocations: Vec<RefundAllocation>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let lines = allocations
            .into_iter()
            .zip(1u32..)
            .map(|(a, line_no)| ReturnLine::from_allocation(line_no, a))
            .collect();
        Self {
            code: return_code(&id),
            id,
            origin,
            origin_id,
            origin_code,
            partner,
            status: ReturnOrderStatus::Draft,
            lines,
            created_at,
            version: 1,
        }
    }

    pub fn id_typed(&self) -> ReturnOrderId {
        self.id
    }

    /// Human-facing reference, `RET-` followed by eight hex digits.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn origin(&self) -> ReturnOrigin {
        self.origin
    }

    pub fn origin_id(&self) -> AggregateId {
        self.origin_id
    }

    pub fn origin_code(&self) -> &str {
        &self.origin_code
    }

    pub fn partner(&self) -> &PartyCode {
        &self.partner
    }

    pub fn status(&self) -> ReturnOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[ReturnLine] {
        &self.lines
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn total_refund(&self) -> Decimal {
        self.lines.iter().map(|l| l.refund_amount).sum()
    }

    pub(crate) fn confirm(&mut self) -> DomainResult<()> {
        self.transition(ReturnOrderStatus::Draft, ReturnOrderStatus::Confirmed)
    }

    pub(crate) fn mark_done(&mut self) -> DomainResult<()> {
        self.transition(ReturnOrderStatus::Confirmed, ReturnOrderStatus::Done)
    }

    pub(crate) fn cancel(&mut self) -> DomainResult<()> {
        match self.status {
            ReturnOrderStatus::Draft | ReturnOrderStatus::Confirmed => {
                self.status = ReturnOrderStatus::Cancelled;
                self.version += 1;
                Ok(())
            }
            other => Err(DomainError::invariant(format!(
                "return order {} cannot be cancelled from {other:?}",
                self.code
            ))),
        }
    }

    fn transition(&mut self, from: ReturnOrderStatus, to: ReturnOrderStatus) -> DomainResult<()> {
        if self.status != from {
            return Err(DomainError::invariant(format!(
                "return order {} must be {from:?} to become {to:?}, is {:?}",
                self.code, self.status
            )));
        }
        self.status = to;
        self.version += 1;
        Ok(())
    }
}

impl AggregateRoot for ReturnOrder {
    type Id = ReturnOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn return_code(id: &ReturnOrderId) -> String {
    let hex = id.0.as_uuid().simple().to_string().to_uppercase();
    // v7 ids share their leading timestamp bits; the tail is random.
    format!("RET-{}", &hex[hex.len() - 8..])
}
