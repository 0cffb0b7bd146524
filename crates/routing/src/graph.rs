//! Validated, indexed rule graph.

use std::collections::{BTreeMap, HashMap, HashSet};

use wms_core::{DomainError, DomainResult, LocationCode, RouteCode, ZoneCode};

use crate::rule::{Route, Rule};
use crate::topology::Topology;
use crate::zone::{Location, Zone};

/// Immutable routing configuration with an explicit `(route, target zone) → rule` index.
///
/// Construction fails fast on any inconsistency, so a loaded graph can always answer
/// [`resolve`](Self::resolve) deterministically: exactly one active rule or a
/// "no route" configuration error.
#[derive(Debug, Clone)]
pub struct RuleGraph {
    version: u64,
    zones: BTreeMap<ZoneCode, Zone>,
    locations: BTreeMap<LocationCode, Location>,
    zone_locations: HashMap<ZoneCode, Vec<LocationCode>>,
    routes: BTreeMap<RouteCode, Route>,
    rules: Vec<Rule>,
    index: HashMap<(RouteCode, ZoneCode), usize>,
}

impl RuleGraph {
    /// Validate and index a topology as version 1.
    pub fn load(topology: Topology) -> DomainResult<Self> {
        Self::load_versioned(topology, 1)
    }

    pub fn load_versioned(topology: Topology, version: u64) -> DomainResult<Self> {
        let Topology {
            zones,
            locations,
            routes,
            rules,
        } = topology;

        let mut zone_map = BTreeMap::new();
        for zone in zones {
            let code = zone.code.clone();
            if zone_map.insert(code.clone(), zone).is_some() {
                return Err(DomainError::configuration(format!("duplicate zone {code}")));
            }
        }

        let mut location_map = BTreeMap::new();
        let mut zone_locations: HashMap<ZoneCode, Vec<LocationCode>> = HashMap::new();
        for location in locations {
            if location.zones.is_empty() {
                return Err(DomainError::configuration(format!(
                    "location {} belongs to no zone",
                    location.code
                )));
            }
            for zone in &location.zones {
                if !zone_map.contains_key(zone) {
                    return Err(DomainError::configuration(format!(
                        "location {} references unknown zone {zone}",
                        location.code
                    )));
                }
                zone_locations
                    .entry(zone.clone())
                    .or_default()
                    .push(location.code.clone());
            }
            let code = location.code.clone();
            if location_map.insert(code.clone(), location).is_some() {
                return Err(DomainError::configuration(format!("duplicate location {code}")));
            }
        }
        for members in zone_locations.values_mut() {
            members.sort();
        }

        let mut route_map = BTreeMap::new();
        for route in routes {
            let code = route.code.clone();
            if route_map.insert(code.clone(), route).is_some() {
                return Err(DomainError::configuration(format!("duplicate route {code}")));
            }
        }

        let mut rule_codes = HashSet::new();
        let mut index = HashMap::new();
        for (pos, rule) in rules.iter().enumerate() {
            if !rule_codes.insert(rule.code.as_str()) {
                return Err(DomainError::configuration(format!(
                    "duplicate rule code {}",
                    rule.code
                )));
            }
            let Some(route) = route_map.get(&rule.route) else {
                return Err(DomainError::configuration(format!(
                    "rule {} references unknown route {}",
                    rule.code, rule.route
                )));
            };
            for zone in [&rule.source, &rule.target] {
                if !zone_map.contains_key(zone) {
                    return Err(DomainError::configuration(format!(
                        "rule {} references unknown zone {zone}",
                        rule.code
                    )));
                }
            }
            if rule.source == rule.target {
                return Err(DomainError::configuration(format!(
                    "rule {} loops on zone {}",
                    rule.code, rule.source
                )));
            }
            if !(rule.active && route.active) {
                continue;
            }

            let key = (rule.route.clone(), rule.target.clone());
            if let Some(existing) = index.insert(key, pos) {
                let existing: &Rule = &rules[existing];
                return Err(DomainError::configuration(format!(
                    "ambiguous rules {} and {} on route {} for target zone {}",
                    existing.code, rule.code, rule.route, rule.target
                )));
            }
        }

        tracing::info!(
            version,
            zones = zone_map.len(),
            locations = location_map.len(),
            routes = route_map.len(),
            active_rules = index.len(),
            "routing topology loaded"
        );

        Ok(Self {
            version,
            zones: zone_map,
            locations: location_map,
            zone_locations,
            routes: route_map,
            rules,
            index,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The single active rule delivering into `target` on `route`.
    pub fn resolve(&self, route: &RouteCode, target: &ZoneCode) -> DomainResult<&Rule> {
        self.index
            .get(&(route.clone(), target.clone()))
            .map(|pos| &self.rules[*pos])
            .ok_or_else(|| {
                DomainError::configuration(format!(
                    "no route: no active rule on route {route} delivers into zone {target}"
                ))
            })
    }

    /// Whether some active rule on `route` delivers into `target`.
    pub fn has_rule(&self, route: &RouteCode, target: &ZoneCode) -> bool {
        self.index.contains_key(&(route.clone(), target.clone()))
    }

    pub fn zone(&self, code: &ZoneCode) -> Option<&Zone> {
        self.zones.get(code)
    }

    pub fn has_zone(&self, code: &ZoneCode) -> bool {
        self.zones.contains_key(code)
    }

    pub fn route(&self, code: &RouteCode) -> Option<&Route> {
        self.routes.get(code)
    }

    pub fn location(&self, code: &LocationCode) -> Option<&Location> {
        self.locations.get(code)
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Member locations of a zone, sorted by code.
    pub fn locations_in(&self, zone: &ZoneCode) -> &[LocationCode] {
        self.zone_locations
            .get(zone)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Default landing slot of a zone (its first location by code).
    pub fn primary_location(&self, zone: &ZoneCode) -> DomainResult<&LocationCode> {
        self.locations_in(zone).first().ok_or_else(|| {
            DomainError::configuration(format!("zone {zone} has no locations"))
        })
    }

    pub fn zone_contains(&self, zone: &ZoneCode, location: &LocationCode) -> bool {
        self.locations
            .get(location)
            .is_some_and(|l| l.belongs_to(zone))
    }

    pub fn zones_of(&self, location: &LocationCode) -> &[ZoneCode] {
        self.locations
            .get(location)
            .map(|l| l.zones.as_slice())
            .unwrap_or(&[])
    }
}
