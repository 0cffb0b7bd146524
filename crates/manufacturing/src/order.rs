use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wms_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ItemCode, ZoneCode};
use wms_events::Event;

/// Manufacturing order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManufacturingOrderId(pub AggregateId);

impl ManufacturingOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ManufacturingOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManufacturingOrderStatus {
    Draft,
    Confirmed,
    Done,
    Cancelled,
}

/// Aggregate root: ManufacturingOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturingOrder {
    id: ManufacturingOrderId,
    item: Option<ItemCode>,
    quantity: i64,
    production_zone: Option<ZoneCode>,
    parent: Option<ManufacturingOrderId>,
    status: ManufacturingOrderStatus,
    version: u64,
    created: bool,
}

impl ManufacturingOrder {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ManufacturingOrderId) -> Self {
        Self {
            id,
            item: None,
            quantity: 0,
            production_zone: None,
            parent: None,
            status: ManufacturingOrderStatus::Draft,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ManufacturingOrderId {
        self.id
    }

    pub fn item(&self) -> Option<&ItemCode> {
        self.item.as_ref()
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn production_zone(&self) -> Option<&ZoneCode> {
        self.production_zone.as_ref()
    }

    /// The order whose explosion produced this one, if any.
    pub fn parent(&self) -> Option<ManufacturingOrderId> {
        self.parent
    }

    pub fn status(&self) -> ManufacturingOrderStatus {
        self.status
    }
}

impl AggregateRoot for ManufacturingOrder {
    type Id = ManufacturingOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateManufacturingOrder {
    pub order_id: ManufacturingOrderId,
    pub item: ItemCode,
    pub quantity: i64,
    pub production_zone: ZoneCode,
    pub parent: Option<ManufacturingOrderId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmManufacturingOrder {
    pub order_id: ManufacturingOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteManufacturingOrder {
    pub order_id: ManufacturingOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelManufacturingOrder {
    pub order_id: ManufacturingOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManufacturingOrderCommand {
    Create(CreateManufacturingOrder),
    Confirm(ConfirmManufacturingOrder),
    Complete(CompleteManufacturingOrder),
    Cancel(CancelManufacturingOrder),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturingOrderCreated {
    pub order_id: ManufacturingOrderId,
    pub item: ItemCode,
    pub quantity: i64,
    pub production_zone: ZoneCode,
    pub parent: Option<ManufacturingOrderId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturingOrderConfirmed {
    pub order_id: ManufacturingOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Production finished: `quantity` of `item` is now available at the production zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturingOrderCompleted {
    pub order_id: ManufacturingOrderId,
    pub item: ItemCode,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturingOrderCancelled {
    pub order_id: ManufacturingOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManufacturingOrderEvent {
    Created(ManufacturingOrderCreated),
    Confirmed(ManufacturingOrderConfirmed),
    Completed(ManufacturingOrderCompleted),
    Cancelled(ManufacturingOrderCancelled),
}

impl Event for ManufacturingOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ManufacturingOrderEvent::Created(_) => "manufacturing.order.created",
            ManufacturingOrderEvent::Confirmed(_) => "manufacturing.order.confirmed",
            ManufacturingOrderEvent::Completed(_) => "manufacturing.order.completed",
            ManufacturingOrderEvent::Cancelled(_) => "manufacturing.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ManufacturingOrderEvent::Created(e) => e.occurred_at,
            ManufacturingOrderEvent::Confirmed(e) => e.occurred_at,
            ManufacturingOrderEvent::Completed(e) => e.occurred_at,
            ManufacturingOrderEvent::Cancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ManufacturingOrder {
    type Command = ManufacturingOrderCommand;
    type Event = ManufacturingOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ManufacturingOrderEvent::Created(e) => {
                self.id = e.order_id;
                self.item = Some(e.item.clone());
                self.quantity = e.quantity;
                self.production_zone = Some(e.production_zone.clone());
                self.parent = e.parent;
                self.status = ManufacturingOrderStatus::Draft;
                self.created = true;
            }
            ManufacturingOrderEvent::Confirmed(_) => {
                self.status = ManufacturingOrderStatus::Confirmed;
            }
            ManufacturingOrderEvent::Completed(_) => {
                self.status = ManufacturingOrderStatus::Done;
            }
            ManufacturingOrderEvent::Cancelled(_) => {
                self.status = ManufacturingOrderStatus::Cancelled;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ManufacturingOrderCommand::Create(cmd) => self.handle_create(cmd),
            ManufacturingOrderCommand::Confirm(cmd) => self.handle_confirm(cmd),
            ManufacturingOrderCommand::Complete(cmd) => self.handle_complete(cmd),
            ManufacturingOrderCommand::Cancel(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl ManufacturingOrder {
    fn ensure_order_id(&self, order_id: ManufacturingOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("manufacturing order {order_id}")));
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreateManufacturingOrder,
    ) -> Result<Vec<ManufacturingOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("manufacturing order already exists"));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        Ok(vec![ManufacturingOrderEvent::Created(ManufacturingOrderCreated {
            order_id: cmd.order_id,
            item: cmd.item.clone(),
            quantity: cmd.quantity,
            production_zone: cmd.production_zone.clone(),
            parent: cmd.parent,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(
        &self,
        cmd: &ConfirmManufacturingOrder,
    ) -> Result<Vec<ManufacturingOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        if self.status != ManufacturingOrderStatus::Draft {
            return Err(DomainError::invariant(
                "only draft manufacturing orders can be confirmed",
            ));
        }

        Ok(vec![ManufacturingOrderEvent::Confirmed(
            ManufacturingOrderConfirmed {
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_complete(
        &self,
        cmd: &CompleteManufacturingOrder,
    ) -> Result<Vec<ManufacturingOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        if self.status != ManufacturingOrderStatus::Confirmed {
            return Err(DomainError::invariant(
                "cannot complete a manufacturing order before it is confirmed",
            ));
        }
        let Some(item) = self.item.clone() else {
            return Err(DomainError::invariant("item must be set"));
        };

        Ok(vec![ManufacturingOrderEvent::Completed(
            ManufacturingOrderCompleted {
                order_id: cmd.order_id,
                item,
                quantity: self.quantity,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_cancel(
        &self,
        cmd: &CancelManufacturingOrder,
    ) -> Result<Vec<ManufacturingOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        if matches!(
            self.status,
            ManufacturingOrderStatus::Done | ManufacturingOrderStatus::Cancelled
        ) {
            return Err(DomainError::invariant(
                "cannot cancel a finished manufacturing order",
            ));
        }

        Ok(vec![ManufacturingOrderEvent::Cancelled(
            ManufacturingOrderCancelled {
                order_id: cmd.order_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wms_events::execute;

    fn test_order_id() -> ManufacturingOrderId {
        ManufacturingOrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn created(quantity: i64) -> ManufacturingOrder {
        let order_id = test_order_id();
        let mut order = ManufacturingOrder::empty(order_id);
        let cmd = CreateManufacturingOrder {
            order_id,
            item: "bike".into(),
            quantity,
            production_zone: "ZON07".into(),
            parent: None,
            occurred_at: test_time(),
        };
        execute(&mut order, &ManufacturingOrderCommand::Create(cmd)).unwrap();
        order
    }

    #[test]
    fn lifecycle_runs_draft_confirmed_done() {
        let mut order = created(5);
        assert_eq!(order.status(), ManufacturingOrderStatus::Draft);

        let id = order.id_typed();
        execute(
            &mut order,
            &ManufacturingOrderCommand::Confirm(ConfirmManufacturingOrder {
                order_id: id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        let events = execute(
            &mut order,
            &ManufacturingOrderCommand::Complete(CompleteManufacturingOrder {
                order_id: id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(order.status(), ManufacturingOrderStatus::Done);
        match &events[0] {
            ManufacturingOrderEvent::Completed(e) => assert_eq!(e.quantity, 5),
            _ => panic!("Expected Completed event"),
        }
        assert_eq!(order.version(), 3);
    }

    #[test]
    fn cannot_complete_a_draft() {
        let order = created(1);
        let err = order
            .handle(&ManufacturingOrderCommand::Complete(CompleteManufacturingOrder {
                order_id: order.id_typed(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let order_id = test_order_id();
        let order = ManufacturingOrder::empty(order_id);
        let cmd = CreateManufacturingOrder {
            order_id,
            item: "bike".into(),
            quantity: 0,
            production_zone: "ZON07".into(),
            parent: None,
            occurred_at: test_time(),
        };
        assert!(order.handle(&ManufacturingOrderCommand::Create(cmd)).is_err());
    }
}
