use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, ItemCode, LotCode};

/// One component of a recipe: `quantity` units per produced unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    pub component: ItemCode,
    pub quantity: i64,
    #[serde(default)]
    pub lot: Option<LotCode>,
}

/// Bill of materials of a manufacturable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bom {
    pub item: ItemCode,
    pub lines: Vec<BomLine>,
}

/// Demand for one component produced by exploding a BOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRequirement {
    pub component: ItemCode,
    pub lot: Option<LotCode>,
    pub quantity: i64,
}

impl Bom {
    pub fn new(item: impl Into<ItemCode>) -> Self {
        Self {
            item: item.into(),
            lines: Vec::new(),
        }
    }

    pub fn with_line(mut self, component: impl Into<ItemCode>, quantity: i64) -> Self {
        self.lines.push(BomLine {
            component: component.into(),
            quantity,
            lot: None,
        });
        self
    }

    /// Structural checks that do not need the rest of the catalog.
    pub fn validate(&self) -> DomainResult<()> {
        if self.lines.is_empty() {
            return Err(DomainError::validation(format!("BOM of {} has no lines", self.item)));
        }
        for line in &self.lines {
            if line.component == self.item {
                return Err(DomainError::validation(format!(
                    "BOM of {} references itself",
                    self.item
                )));
            }
            if line.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "BOM of {} has non-positive quantity for {}",
                    self.item, line.component
                )));
            }
        }
        Ok(())
    }

    /// Single-level explosion: `component_quantity = line.quantity × quantity`,
    /// merged per `(component, lot)` in first-seen order.
    pub fn explode(&self, quantity: i64) -> DomainResult<Vec<ComponentRequirement>> {
        self.validate()?;
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let mut out: Vec<ComponentRequirement> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            let required = line.quantity.checked_mul(quantity).ok_or_else(|| {
                DomainError::validation(format!("component quantity overflow for {}", line.component))
            })?;
            match out
                .iter_mut()
                .find(|r| r.component == line.component && r.lot == line.lot)
            {
                Some(existing) => existing.quantity += required,
                None => out.push(ComponentRequirement {
                    component: line.component.clone(),
                    lot: line.lot.clone(),
                    quantity: required,
                }),
            }
        }
        Ok(out)
    }
}
