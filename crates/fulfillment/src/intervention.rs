use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wms_core::{ItemCode, LocationCode, LotCode, ZoneCode};

use crate::movement::MoveId;
use crate::trigger::TriggerId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterventionId(Uuid);

wms_core::impl_uuid_newtype!(InterventionId, "InterventionId");

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterventionStatus {
    Open,
    Resolved,
    Cancelled,
}

/// A move stuck on insufficient stock at its source zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    pub id: InterventionId,
    pub move_id: MoveId,
    pub trigger: Option<TriggerId>,
    pub sequence: u64,
    pub item: ItemCode,
    pub lot: Option<LotCode>,
    pub zone: ZoneCode,
    /// Where the missing stock is expected to land.
    pub blocking_location: LocationCode,
    pub shortfall: i64,
    pub status: InterventionStatus,
    pub opened_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Intervention {
    pub fn is_open(&self) -> bool {
        self.status == InterventionStatus::Open
    }
}
