use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wms_core::{AggregateId, ItemCode, LotCode, RouteCode, ZoneCode};
use wms_events::integration::OriginModel;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(Uuid);

wms_core::impl_uuid_newtype!(TriggerId, "TriggerId");

/// The order line a trigger was raised for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OriginRef {
    pub model: OriginModel,
    pub id: AggregateId,
    pub line_no: u32,
}

impl core::fmt::Display for OriginRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}#{}", self.model, self.id, self.line_no)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerStatus {
    Pending,
    Resolved,
    Cancelled,
}

/// A unit of demand anchored at a destination zone.
///
/// Child triggers are raised at the source zone of a pull that came up short; they share
/// the origin line of their parent. `done_quantity` is the running total of completed
/// move lines of the trigger's demand move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: TriggerId,
    /// Creation order; older demand is served first.
    pub sequence: u64,
    pub origin: OriginRef,
    pub parent: Option<TriggerId>,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
    pub target_zone: ZoneCode,
    pub route: RouteCode,
    pub status: TriggerStatus,
    pub done_quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl Trigger {
    pub fn is_pending(&self) -> bool {
        self.status == TriggerStatus::Pending
    }

    pub fn remaining(&self) -> i64 {
        self.quantity - self.done_quantity
    }
}
