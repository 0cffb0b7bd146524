use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wms_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ItemCode, LotCode, PartyCode};
use wms_events::Event;

/// Purchase order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Confirmed,
    Cancelled,
}

/// Purchase order line, unique per `(item, lot)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub line_no: u32,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    vendor: Option<PartyCode>,
    status: PurchaseOrderStatus,
    lines: Vec<PurchaseOrderLine>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            vendor: None,
            status: PurchaseOrderStatus::Draft,
            lines: Vec::new(),
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn vendor(&self) -> Option<&PartyCode> {
        self.vendor.as_ref()
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[PurchaseOrderLine] {
        &self.lines
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn line_for(&self, item: &ItemCode, lot: Option<&LotCode>) -> Option<&PurchaseOrderLine> {
        self.lines
            .iter()
            .find(|l| &l.item == item && l.lot.as_ref() == lot)
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Draft orders still accept appended supply.
    pub fn is_open(&self) -> bool {
        self.created && self.status == PurchaseOrderStatus::Draft
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub vendor: PartyCode,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine (only allowed in Draft). Merges into an existing `(item, lot)` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub order_id: PurchaseOrderId,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReduceLine (only allowed in Draft). Withdraws supply that is no longer needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceLine {
    pub order_id: PurchaseOrderId,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmPurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelPurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreatePurchaseOrder(CreatePurchaseOrder),
    AddLine(AddLine),
    ReduceLine(ReduceLine),
    Confirm(ConfirmPurchaseOrder),
    Cancel(CancelPurchaseOrder),
}

/// Event: PurchaseOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub order_id: PurchaseOrderId,
    pub vendor: PartyCode,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderLineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLineAdded {
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderLineIncreased (merge into an existing line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLineIncreased {
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderLineReduced. A line reduced to zero is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLineReduced {
    pub order_id: PurchaseOrderId,
    pub line_no: u32,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderConfirmed {
    pub order_id: PurchaseOrderId,
    pub vendor: PartyCode,
    pub lines: Vec<PurchaseOrderLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCancelled {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    PurchaseOrderLineAdded(PurchaseOrderLineAdded),
    PurchaseOrderLineIncreased(PurchaseOrderLineIncreased),
    PurchaseOrderLineReduced(PurchaseOrderLineReduced),
    PurchaseOrderConfirmed(PurchaseOrderConfirmed),
    PurchaseOrderCancelled(PurchaseOrderCancelled),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(_) => "purchasing.order.created",
            PurchaseOrderEvent::PurchaseOrderLineAdded(_) => "purchasing.order.line_added",
            PurchaseOrderEvent::PurchaseOrderLineIncreased(_) => "purchasing.order.line_increased",
            PurchaseOrderEvent::PurchaseOrderLineReduced(_) => "purchasing.order.line_reduced",
            PurchaseOrderEvent::PurchaseOrderConfirmed(_) => "purchasing.order.confirmed",
            PurchaseOrderEvent::PurchaseOrderCancelled(_) => "purchasing.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderLineIncreased(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderLineReduced(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderConfirmed(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.id = e.order_id;
                self.vendor = Some(e.vendor.clone());
                self.status = PurchaseOrderStatus::Draft;
                self.lines.clear();
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            PurchaseOrderEvent::PurchaseOrderLineAdded(e) => {
                self.lines.push(PurchaseOrderLine {
                    line_no: e.line_no,
                    item: e.item.clone(),
                    lot: e.lot.clone(),
                    quantity: e.quantity,
                });
            }
            PurchaseOrderEvent::PurchaseOrderLineIncreased(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                    line.quantity += e.quantity;
                }
            }
            PurchaseOrderEvent::PurchaseOrderLineReduced(e) => {
                if let Some(line) = self.lines.iter_mut().find(|l| l.line_no == e.line_no) {
                    line.quantity -= e.quantity;
                }
                self.lines.retain(|l| l.quantity > 0);
            }
            PurchaseOrderEvent::PurchaseOrderConfirmed(_) => {
                self.status = PurchaseOrderStatus::Confirmed;
            }
            PurchaseOrderEvent::PurchaseOrderCancelled(_) => {
                self.status = PurchaseOrderStatus::Cancelled;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreatePurchaseOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            PurchaseOrderCommand::ReduceLine(cmd) => self.handle_reduce_line(cmd),
            PurchaseOrderCommand::Confirm(cmd) => self.handle_confirm(cmd),
            PurchaseOrderCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("purchase order {order_id}")));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_draft(&self, action: &str) -> Result<(), DomainError> {
        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invariant(format!(
                "cannot {action} a purchase order once confirmed or cancelled"
            )));
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCreated(
            PurchaseOrderCreated {
                order_id: cmd.order_id,
                vendor: cmd.vendor.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        self.ensure_draft("modify")?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        if let Some(line) = self.line_for(&cmd.item, cmd.lot.as_ref()) {
            return Ok(vec![PurchaseOrderEvent::PurchaseOrderLineIncreased(
                PurchaseOrderLineIncreased {
                    order_id: cmd.order_id,
                    line_no: line.line_no,
                    quantity: cmd.quantity,
                    occurred_at: cmd.occurred_at,
                },
            )]);
        }

        let next_line_no = self.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1;
        Ok(vec![PurchaseOrderEvent::PurchaseOrderLineAdded(
            PurchaseOrderLineAdded {
                order_id: cmd.order_id,
                line_no: next_line_no,
                item: cmd.item.clone(),
                lot: cmd.lot.clone(),
                quantity: cmd.quantity,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_reduce_line(&self, cmd: &ReduceLine) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        self.ensure_draft("modify")?;

        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let Some(line) = self.line_for(&cmd.item, cmd.lot.as_ref()) else {
            return Err(DomainError::not_found(format!(
                "purchase order line for item {}",
                cmd.item
            )));
        };
        if cmd.quantity > line.quantity {
            return Err(DomainError::validation(format!(
                "cannot reduce line {} by {} (quantity {})",
                line.line_no, cmd.quantity, line.quantity
            )));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderLineReduced(
            PurchaseOrderLineReduced {
                order_id: cmd.order_id,
                line_no: line.line_no,
                quantity: cmd.quantity,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_confirm(
        &self,
        cmd: &ConfirmPurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        self.ensure_draft("confirm")?;

        if self.lines.is_empty() {
            return Err(DomainError::validation(
                "cannot confirm purchase order without lines",
            ));
        }
        let Some(vendor) = self.vendor.clone() else {
            return Err(DomainError::invariant("vendor must be set"));
        };

        Ok(vec![PurchaseOrderEvent::PurchaseOrderConfirmed(
            PurchaseOrderConfirmed {
                order_id: cmd.order_id,
                vendor,
                lines: self.lines.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_cancel(
        &self,
        cmd: &CancelPurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;

        if self.status == PurchaseOrderStatus::Cancelled {
            return Err(DomainError::invariant("purchase order already cancelled"));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCancelled(
            PurchaseOrderCancelled {
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wms_events::execute;

    fn test_order_id() -> PurchaseOrderId {
        PurchaseOrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn created_order(order_id: PurchaseOrderId) -> PurchaseOrder {
        let mut order = PurchaseOrder::empty(order_id);
        let cmd = CreatePurchaseOrder {
            order_id,
            vendor: "VENDOR-1".into(),
            occurred_at: test_time(),
        };
        execute(&mut order, &PurchaseOrderCommand::CreatePurchaseOrder(cmd)).unwrap();
        order
    }

    fn add(order: &mut PurchaseOrder, item: &str, lot: Option<&str>, quantity: i64) {
        let cmd = AddLine {
            order_id: order.id_typed(),
            item: item.into(),
            lot: lot.map(LotCode::from),
            quantity,
            occurred_at: test_time(),
        };
        execute(order, &PurchaseOrderCommand::AddLine(cmd)).unwrap();
    }

    #[test]
    fn create_purchase_order_emits_created_event() {
        let order_id = test_order_id();
        let order = PurchaseOrder::empty(order_id);

        let cmd = CreatePurchaseOrder {
            order_id,
            vendor: "VENDOR-1".into(),
            occurred_at: test_time(),
        };
        let events = order
            .handle(&PurchaseOrderCommand::CreatePurchaseOrder(cmd))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                assert_eq!(e.order_id, order_id);
                assert_eq!(e.vendor.as_str(), "VENDOR-1");
            }
            _ => panic!("Expected PurchaseOrderCreated event"),
        }
    }

    #[test]
    fn lines_are_merged_by_item_and_lot() {
        let mut order = created_order(test_order_id());
        add(&mut order, "compA", None, 4);
        add(&mut order, "compA", None, 6);
        add(&mut order, "compA", Some("LOT-1"), 2);

        assert_eq!(order.lines().len(), 2);
        assert_eq!(order.line_for(&"compA".into(), None).unwrap().quantity, 10);
        assert_eq!(order.total_quantity(), 12);
    }

    #[test]
    fn reducing_a_line_to_zero_removes_it() {
        let mut order = created_order(test_order_id());
        add(&mut order, "compA", None, 4);
        add(&mut order, "compB", None, 1);

        let cmd = ReduceLine {
            order_id: order.id_typed(),
            item: "compA".into(),
            lot: None,
            quantity: 4,
            occurred_at: test_time(),
        };
        execute(&mut order, &PurchaseOrderCommand::ReduceLine(cmd)).unwrap();

        assert_eq!(order.lines().len(), 1);
        assert_eq!(order.lines()[0].item.as_str(), "compB");
    }

    #[test]
    fn cannot_confirm_without_lines() {
        let order = created_order(test_order_id());
        let cmd = ConfirmPurchaseOrder {
            order_id: order.id_typed(),
            occurred_at: test_time(),
        };
        let err = order.handle(&PurchaseOrderCommand::Confirm(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn confirmed_orders_are_frozen() {
        let mut order = created_order(test_order_id());
        add(&mut order, "compA", None, 4);
        let cmd = ConfirmPurchaseOrder {
            order_id: order.id_typed(),
            occurred_at: test_time(),
        };
        let events = execute(&mut order, &PurchaseOrderCommand::Confirm(cmd)).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::Confirmed);
        match &events[0] {
            PurchaseOrderEvent::PurchaseOrderConfirmed(e) => assert_eq!(e.lines.len(), 1),
            _ => panic!("Expected PurchaseOrderConfirmed event"),
        }

        let cmd = AddLine {
            order_id: order.id_typed(),
            item: "compB".into(),
            lot: None,
            quantity: 1,
            occurred_at: test_time(),
        };
        let err = order.handle(&PurchaseOrderCommand::AddLine(cmd)).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("once confirmed") => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
        assert!(!order.is_open());
    }

    #[test]
    fn cancel_is_allowed_once() {
        let mut order = created_order(test_order_id());
        let cmd = CancelPurchaseOrder {
            order_id: order.id_typed(),
            occurred_at: test_time(),
        };
        execute(&mut order, &PurchaseOrderCommand::Cancel(cmd.clone())).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::Cancelled);
        assert!(order.handle(&PurchaseOrderCommand::Cancel(cmd)).is_err());
    }

    proptest! {
        /// Property: merging any sequence of additions yields one line per (item, lot)
        /// whose quantities sum to the total added.
        #[test]
        fn merged_lines_preserve_total_quantity(
            adds in prop::collection::vec((0usize..3, prop::option::of(0usize..2), 1i64..50), 1..20)
        ) {
            let items = ["compA", "compB", "compC"];
            let lots = ["LOT-1", "LOT-2"];
            let mut order = created_order(test_order_id());
            let mut total = 0;
            for (item, lot, qty) in &adds {
                add(&mut order, items[*item], lot.map(|l| lots[l]), *qty);
                total += qty;
            }

            prop_assert_eq!(order.total_quantity(), total);
            let mut keys: Vec<_> = order.lines().iter().map(|l| (l.item.clone(), l.lot.clone())).collect();
            let before = keys.len();
            keys.sort();
            keys.dedup();
            prop_assert_eq!(before, keys.len());
        }
    }
}
