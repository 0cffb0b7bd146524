//! Item master data the engine consults: recipes, vendors and dropship terms.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, ItemCode, PartyCode};
use wms_manufacturing::{Bom, BomLine};

/// Read-only catalog lookups.
pub trait Catalog: Send + Sync {
    fn bom(&self, item: &ItemCode) -> Option<&Bom>;

    /// Preferred vendor of a purchased item.
    fn vendor_of(&self, item: &ItemCode) -> Option<&PartyCode>;

    fn accepts_dropship(&self, vendor: &PartyCode) -> bool;

    /// Quantity the vendor reports on hand for `item`.
    fn vendor_stock(&self, vendor: &PartyCode, item: &ItemCode) -> i64;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub code: ItemCode,
    #[serde(default)]
    pub vendor: Option<PartyCode>,
    #[serde(default)]
    pub bom: Vec<BomLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorTerms {
    pub code: PartyCode,
    #[serde(default)]
    pub accepts_dropship: bool,
    #[serde(default)]
    pub stock: HashMap<ItemCode, i64>,
}

impl VendorTerms {
    /// A vendor that declines dropshipping and reports no stock.
    pub fn new(code: impl Into<PartyCode>) -> Self {
        Self {
            code: code.into(),
            accepts_dropship: false,
            stock: HashMap::new(),
        }
    }
}

/// Catalog file contents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub items: Vec<CatalogItem>,
    #[serde(default)]
    pub vendors: Vec<VendorTerms>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    boms: HashMap<ItemCode, Bom>,
    vendors: HashMap<ItemCode, PartyCode>,
    terms: HashMap<PartyCode, VendorTerms>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from file contents, rejecting malformed recipes and duplicates.
    pub fn from_data(data: CatalogData) -> DomainResult<Self> {
        let mut catalog = Self::new();
        for item in data.items {
            if catalog.boms.contains_key(&item.code) || catalog.vendors.contains_key(&item.code) {
                return Err(DomainError::validation(format!(
                    "item {} is listed twice in the catalog",
                    item.code
                )));
            }
            if let Some(vendor) = item.vendor {
                catalog.vendors.insert(item.code.clone(), vendor);
            }
            if !item.bom.is_empty() {
                let bom = Bom {
                    item: item.code.clone(),
                    lines: item.bom,
                };
                bom.validate()?;
                catalog.boms.insert(item.code, bom);
            }
        }
        for terms in data.vendors {
            if catalog.terms.contains_key(&terms.code) {
                return Err(DomainError::validation(format!(
                    "vendor {} is listed twice in the catalog",
                    terms.code
                )));
            }
            catalog.terms.insert(terms.code.clone(), terms);
        }
        Ok(catalog)
    }

    pub fn with_bom(mut self, bom: Bom) -> Self {
        self.boms.insert(bom.item.clone(), bom);
        self
    }

    pub fn with_vendor(mut self, item: impl Into<ItemCode>, vendor: impl Into<PartyCode>) -> Self {
        self.vendors.insert(item.into(), vendor.into());
        self
    }

    pub fn with_dropship_vendor(mut self, vendor: impl Into<PartyCode>, accepts: bool) -> Self {
        let vendor = vendor.into();
        self.terms
            .entry(vendor.clone())
            .or_insert_with(|| VendorTerms::new(vendor))
            .accepts_dropship = accepts;
        self
    }

    pub fn with_vendor_stock(
        mut self,
        vendor: impl Into<PartyCode>,
        item: impl Into<ItemCode>,
        quantity: i64,
    ) -> Self {
        let vendor = vendor.into();
        self.terms
            .entry(vendor.clone())
            .or_insert_with(|| VendorTerms::new(vendor))
            .stock
            .insert(item.into(), quantity);
        self
    }
}

impl Catalog for InMemoryCatalog {
    fn bom(&self, item: &ItemCode) -> Option<&Bom> {
        self.boms.get(item)
    }

    fn vendor_of(&self, item: &ItemCode) -> Option<&PartyCode> {
        self.vendors.get(item)
    }

    fn accepts_dropship(&self, vendor: &PartyCode) -> bool {
        self.terms.get(vendor).is_some_and(|t| t.accepts_dropship)
    }

    fn vendor_stock(&self, vendor: &PartyCode, item: &ItemCode) -> i64 {
        self.terms
            .get(vendor)
            .and_then(|t| t.stock.get(item).copied())
            .unwrap_or(0)
    }
}
