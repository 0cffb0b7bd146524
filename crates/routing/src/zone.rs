use serde::{Deserialize, Serialize};

use wms_core::{LocationCode, ZoneCode};

/// Logical stock area. Zones never hold stock themselves; they aggregate locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub code: ZoneCode,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Dimensions {
    pub fn volume(&self) -> f64 {
        self.dx * self.dy * self.dz
    }
}

/// Physical storage slot, member of one or more zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub code: LocationCode,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub origin: Point,
    #[serde(default)]
    pub dimensions: Dimensions,
    pub zones: Vec<ZoneCode>,
}

impl Location {
    pub fn belongs_to(&self, zone: &ZoneCode) -> bool {
        self.zones.iter().any(|z| z == zone)
    }
}
