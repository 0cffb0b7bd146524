use serde::{Deserialize, Serialize};

use crate::rule::{Route, Rule};
use crate::zone::{Location, Zone};

/// Raw routing configuration as read from disk.
///
/// A `Topology` is unvalidated; build a [`RuleGraph`](crate::RuleGraph) from it to use it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}
