use serde::Serialize;
use uuid::Uuid;

use crate::events::EngineEvent;
use crate::intervention::InterventionId;
use crate::movement::{MoveId, MoveStatus, SupplyRef};
use crate::trigger::TriggerId;

/// What one engine operation changed.
///
/// Shortages are not errors: a resolution that leaves a move waiting reports it through
/// [`ResolutionOutcome::is_pending`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionOutcome {
    pub triggers: Vec<TriggerId>,
    pub moves: Vec<MoveId>,
    pub assigned: Vec<MoveId>,
    pub interventions: Vec<InterventionId>,
    pub resolved_interventions: Vec<InterventionId>,
    pub supply: Vec<SupplyRef>,
    pub resolved_triggers: Vec<TriggerId>,
}

impl ResolutionOutcome {
    pub(crate) fn from_events(events: &[(&'static str, Uuid, EngineEvent)]) -> Self {
        let mut out = Self::default();
        for (_, _, event) in events {
            match event {
                EngineEvent::TriggerCreated { trigger_id, .. } => out.triggers.push(*trigger_id),
                EngineEvent::TriggerResolved { trigger_id, .. } => out.resolved_triggers.push(*trigger_id),
                EngineEvent::MoveCreated { move_id, .. } => out.moves.push(*move_id),
                EngineEvent::MoveStatusChanged {
                    move_id,
                    to: MoveStatus::Assigned,
                    ..
                } => out.assigned.push(*move_id),
                EngineEvent::InterventionOpened { intervention_id, .. } => {
                    out.interventions.push(*intervention_id)
                }
                EngineEvent::InterventionResolved { intervention_id, .. } => {
                    out.resolved_interventions.push(*intervention_id)
                }
                EngineEvent::SupplyGenerated { order, .. } => {
                    if !out.supply.contains(order) {
                        out.supply.push(*order);
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Whether shortages opened by this operation are still waiting for stock.
    pub fn is_pending(&self) -> bool {
        self.interventions
            .iter()
            .any(|id| !self.resolved_interventions.contains(id))
    }
}
