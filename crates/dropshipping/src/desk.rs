use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use wms_core::{DomainError, DomainResult};

use crate::decision::{DropshipDecision, DropshipInputs, decide};

/// Audit entry for one answered request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub request_id: String,
    pub inputs: DropshipInputs,
    pub decision: DropshipDecision,
    pub decided_at: DateTime<Utc>,
}

/// Records every decision by request id so retries get the same answer.
#[derive(Debug, Clone, Default)]
pub struct DropshippingDesk {
    records: HashMap<String, DecisionRecord>,
}

impl DropshippingDesk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `request_id`, replaying the stored answer when the request was seen before.
    ///
    /// Reusing an id with different inputs is a `Conflict`.
    pub fn decide(
        &mut self,
        request_id: &str,
        inputs: DropshipInputs,
        now: DateTime<Utc>,
    ) -> DomainResult<DropshipDecision> {
        if let Some(existing) = self.records.get(request_id) {
            if existing.inputs != inputs {
                return Err(DomainError::conflict(format!(
                    "dropship request {request_id} was already answered for different inputs"
                )));
            }
            debug!(request_id, decision = %existing.decision, "dropship decision replayed");
            return Ok(existing.decision);
        }

        inputs.validate()?;
        let decision = decide(&inputs);
        info!(
            request_id,
            item = %inputs.item,
            vendor = %inputs.vendor,
            decision = %decision,
            "dropship decision recorded"
        );
        self.records.insert(
            request_id.to_string(),
            DecisionRecord {
                request_id: request_id.to_string(),
                inputs,
                decision,
                decided_at: now,
            },
        );
        Ok(decision)
    }

    pub fn record(&self, request_id: &str) -> Option<&DecisionRecord> {
        self.records.get(request_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &DecisionRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wms_core::{ItemCode, PartyCode};

    fn inputs(accepts: bool) -> DropshipInputs {
        DropshipInputs {
            item: ItemCode::from("SKU-1"),
            vendor: PartyCode::from("VEND-1"),
            customer: PartyCode::from("CUST-1"),
            carrier: PartyCode::from("UPS"),
            ordered_quantity: 5,
            vendor_accepts_dropship: accepts,
            warehouse_stock: 100,
            vendor_stock: 100,
            shipping_cost_vendor_to_customer: dec!(1),
            shipping_cost_warehouse_to_customer: dec!(99),
        }
    }

    #[test]
    fn refusing_vendor_ships_from_warehouse_even_when_cheaper() {
        let mut desk = DropshippingDesk::new();
        let decision = desk.decide("req-1", inputs(false), Utc::now()).unwrap();
        assert_eq!(decision, DropshipDecision::ShipFromWarehouse);
        assert_eq!(desk.record("req-1").unwrap().decision, decision);
    }

    #[test]
    fn replay_returns_cached_answer() {
        let mut desk = DropshippingDesk::new();
        let first = desk.decide("req-1", inputs(true), Utc::now()).unwrap();
        let again = desk.decide("req-1", inputs(true), Utc::now()).unwrap();
        assert_eq!(first, DropshipDecision::DropshipFromVendor);
        assert_eq!(first, again);
        assert_eq!(desk.len(), 1);
    }

    #[test]
    fn same_id_with_different_inputs_conflicts() {
        let mut desk = DropshippingDesk::new();
        desk.decide("req-1", inputs(true), Utc::now()).unwrap();
        match desk.decide("req-1", inputs(false), Utc::now()) {
            Err(DomainError::Conflict(_)) => {}
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn invalid_inputs_are_not_recorded() {
        let mut desk = DropshippingDesk::new();
        let mut bad = inputs(true);
        bad.ordered_quantity = -2;
        assert!(desk.decide("req-9", bad, Utc::now()).is_err());
        assert!(desk.is_empty());
    }
}
