//! Zone & rule graph.
//!
//! Static configuration of zones, locations, routes and the directional rules that
//! connect zones. Loaded once (see [`RuleGraph::load`]), validated eagerly, and
//! treated as immutable while demand is being resolved.

pub mod graph;
pub mod rule;
pub mod topology;
pub mod zone;

pub use graph::RuleGraph;
pub use rule::{Action, Route, Rule};
pub use topology::Topology;
pub use zone::{Dimensions, Location, Point, Zone};
