//! Moves, move lines and the move state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wms_core::{DomainError, DomainResult, ItemCode, LocationCode, LotCode, ZoneCode};
use wms_manufacturing::ManufacturingOrderId;
use wms_purchasing::PurchaseOrderId;
use wms_routing::Action;

use crate::trigger::TriggerId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveId(Uuid);

wms_core::impl_uuid_newtype!(MoveId, "MoveId");

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveLineId(Uuid);

wms_core::impl_uuid_newtype!(MoveLineId, "MoveLineId");

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveStatus {
    Draft,
    Confirmed,
    Assigned,
    Intervene,
    Done,
    Cancelled,
}

impl MoveStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MoveStatus::Done | MoveStatus::Cancelled)
    }

    /// Legal edges of the move state machine.
    pub fn can_become(&self, next: MoveStatus) -> bool {
        use MoveStatus::*;
        matches!(
            (*self, next),
            (Draft, Confirmed)
                | (Confirmed, Assigned)
                | (Confirmed, Intervene)
                | (Assigned, Intervene)
                | (Assigned, Done)
                | (Intervene, Assigned)
                | (Draft | Confirmed | Assigned | Intervene, Cancelled)
        )
    }
}

impl core::fmt::Display for MoveStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            MoveStatus::Draft => "draft",
            MoveStatus::Confirmed => "confirmed",
            MoveStatus::Assigned => "assigned",
            MoveStatus::Intervene => "intervene",
            MoveStatus::Done => "done",
            MoveStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Why a move exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveRole {
    /// Delivers its trigger's quantity into the trigger's target zone.
    Demand,
    /// Brings generated supply to where the demand move waits for it.
    Supply,
}

/// Purchase or manufacturing order generated to cover a shortfall.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyRef {
    Purchase(PurchaseOrderId),
    Manufacturing(ManufacturingOrderId),
}

impl core::fmt::Display for SupplyRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SupplyRef::Purchase(id) => write!(f, "purchase order {id}"),
            SupplyRef::Manufacturing(id) => write!(f, "manufacturing order {id}"),
        }
    }
}

/// One hop of physical movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub id: MoveId,
    pub trigger: Option<TriggerId>,
    /// FIFO rank shared with the owning trigger.
    pub sequence: u64,
    pub rule: Option<String>,
    pub action: Action,
    pub role: MoveRole,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
    pub source_zone: ZoneCode,
    pub target_zone: ZoneCode,
    pub target_location: LocationCode,
    pub status: MoveStatus,
    pub supply: Option<SupplyRef>,
    pub lines: Vec<MoveLineId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Move {
    pub fn transition(&mut self, next: MoveStatus, at: DateTime<Utc>) -> DomainResult<MoveStatus> {
        if !self.status.can_become(next) {
            return Err(DomainError::invariant(format!(
                "move {} cannot go from {} to {next}",
                self.id, self.status
            )));
        }
        let previous = self.status;
        self.status = next;
        self.updated_at = at;
        Ok(previous)
    }

    /// Moves that are waiting for stock to show up at their source.
    pub fn is_waiting(&self) -> bool {
        matches!(self.status, MoveStatus::Confirmed | MoveStatus::Intervene)
    }
}

/// Item/lot detail of a move, one per source stock cell.
///
/// `reserved` is false for lines sourced from an external zone; nothing is drawn from
/// the ledger for those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveLine {
    pub id: MoveLineId,
    pub move_id: MoveId,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub source_location: LocationCode,
    pub target_location: LocationCode,
    pub quantity: i64,
    pub done_quantity: i64,
    pub reserved: bool,
}

impl MoveLine {
    pub fn remaining(&self) -> i64 {
        self.quantity - self.done_quantity
    }

    pub fn is_done(&self) -> bool {
        self.done_quantity >= self.quantity
    }
}
