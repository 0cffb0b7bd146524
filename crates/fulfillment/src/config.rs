use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, RouteCode, ZoneCode};
use wms_inventory::RetryPolicy;
use wms_routing::RuleGraph;

/// Route and destination zone used for the lines of one business process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRoute {
    pub route: RouteCode,
    pub target_zone: ZoneCode,
}

impl ProcessRoute {
    pub fn new(route: impl Into<RouteCode>, target_zone: impl Into<ZoneCode>) -> Self {
        Self {
            route: route.into(),
            target_zone: target_zone.into(),
        }
    }
}

/// Engine settings.
///
/// Customer and vendor zones are the demand sink and supply source of the topology.
/// Both are external: moves out of them never draw on ledger stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub customer_zone: ZoneCode,
    pub vendor_zone: ZoneCode,
    /// Where manufacturing orders consume components and put their output.
    pub production_zone: ZoneCode,
    pub sale: ProcessRoute,
    pub purchase: ProcessRoute,
    pub returns: ProcessRoute,
    pub manufacturing: ProcessRoute,
    /// Default route of transfer lines; their destination always comes from the line.
    pub transfer_route: RouteCode,
    /// Confirm generated purchase/manufacturing orders right away.
    pub auto_confirm_supply: bool,
    pub lock_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            customer_zone: ZoneCode::from("ZON09"),
            vendor_zone: ZoneCode::from("ZON08"),
            production_zone: ZoneCode::from("ZON07"),
            sale: ProcessRoute::new("SALES", "ZON09"),
            purchase: ProcessRoute::new("RECEIPTS", "ZON01"),
            returns: ProcessRoute::new("RETURNS", "ZON01"),
            manufacturing: ProcessRoute::new("MANUFACTURING", "ZON07"),
            transfer_route: RouteCode::from("TRANSFERS"),
            auto_confirm_supply: false,
            lock_retries: RetryPolicy::default().max_attempts,
        }
    }
}

impl EngineConfig {
    /// Zones that are not part of the warehouse.
    pub fn is_external(&self, zone: &ZoneCode) -> bool {
        zone == &self.vendor_zone || zone == &self.customer_zone
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.lock_retries.max(1),
            ..RetryPolicy::default()
        }
    }

    /// Every configured zone must exist in the graph.
    pub fn validate_against(&self, graph: &RuleGraph) -> DomainResult<()> {
        let zones = [
            ("customer zone", &self.customer_zone),
            ("vendor zone", &self.vendor_zone),
            ("production zone", &self.production_zone),
            ("sale target zone", &self.sale.target_zone),
            ("purchase target zone", &self.purchase.target_zone),
            ("returns target zone", &self.returns.target_zone),
            ("manufacturing target zone", &self.manufacturing.target_zone),
        ];
        for (what, zone) in zones {
            if !graph.has_zone(zone) {
                return Err(DomainError::configuration(format!(
                    "{what} {zone} is not defined in the topology"
                )));
            }
        }
        if self.customer_zone == self.vendor_zone {
            return Err(DomainError::configuration(
                "customer and vendor zones must differ",
            ));
        }
        Ok(())
    }
}
