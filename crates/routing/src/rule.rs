use serde::{Deserialize, Serialize};

use wms_core::{RouteCode, ZoneCode};

/// How a rule satisfies demand arriving at its target zone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Reserve from the source zone, chaining upstream on shortage.
    Pull,
    /// Move whatever arrives at the source zone; never chains upstream.
    Push,
    /// Supply the whole quantity from a purchase or manufacturing order.
    Buy,
    /// Pull what is available, buy the shortfall.
    PullOrBuy,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Pull => "pull",
            Action::Push => "push",
            Action::Buy => "buy",
            Action::PullOrBuy => "pull_or_buy",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named business process (standard fulfillment, returns, manufacturing supply, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub code: RouteCode,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Directional edge `source → target` belonging to exactly one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub code: String,
    pub route: RouteCode,
    pub source: ZoneCode,
    pub target: ZoneCode,
    pub action: Action,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
