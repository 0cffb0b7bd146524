use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, ItemCode, PartyCode};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropshipDecision {
    ShipFromWarehouse,
    DropshipFromVendor,
}

impl DropshipDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropshipDecision::ShipFromWarehouse => "ship_from_warehouse",
            DropshipDecision::DropshipFromVendor => "dropship_from_vendor",
        }
    }
}

impl core::fmt::Display for DropshipDecision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the decision looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropshipInputs {
    pub item: ItemCode,
    pub vendor: PartyCode,
    pub customer: PartyCode,
    pub carrier: PartyCode,
    pub ordered_quantity: i64,
    pub vendor_accepts_dropship: bool,
    pub warehouse_stock: i64,
    pub vendor_stock: i64,
    pub shipping_cost_vendor_to_customer: Decimal,
    pub shipping_cost_warehouse_to_customer: Decimal,
}

impl DropshipInputs {
    pub fn validate(&self) -> DomainResult<()> {
        if self.ordered_quantity <= 0 {
            return Err(DomainError::validation(format!(
                "ordered quantity must be positive, got {}",
                self.ordered_quantity
            )));
        }
        if self.shipping_cost_vendor_to_customer.is_sign_negative()
            || self.shipping_cost_warehouse_to_customer.is_sign_negative()
        {
            return Err(DomainError::validation("shipping costs must not be negative"));
        }
        Ok(())
    }

    fn warehouse_feasible(&self) -> bool {
        self.warehouse_stock >= self.ordered_quantity
    }

    fn vendor_feasible(&self) -> bool {
        self.vendor_stock >= self.ordered_quantity
    }
}

/// Picks where an order line ships from.
///
/// Without vendor acceptance the warehouse always ships. Otherwise the cheaper of the
/// sides able to cover the full quantity wins, ties and the no-feasible-side case fall
/// back to the warehouse (which then replenishes through its routes).
pub fn decide(inputs: &DropshipInputs) -> DropshipDecision {
    if !inputs.vendor_accepts_dropship {
        return DropshipDecision::ShipFromWarehouse;
    }
    match (inputs.warehouse_feasible(), inputs.vendor_feasible()) {
        (_, false) => DropshipDecision::ShipFromWarehouse,
        (false, true) => DropshipDecision::DropshipFromVendor,
        (true, true) => {
            if inputs.shipping_cost_vendor_to_customer < inputs.shipping_cost_warehouse_to_customer {
                DropshipDecision::DropshipFromVendor
            } else {
                DropshipDecision::ShipFromWarehouse
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn inputs() -> DropshipInputs {
        DropshipInputs {
            item: ItemCode::from("SKU-1"),
            vendor: PartyCode::from("VEND-1"),
            customer: PartyCode::from("CUST-1"),
            carrier: PartyCode::from("DHL"),
            ordered_quantity: 10,
            vendor_accepts_dropship: true,
            warehouse_stock: 50,
            vendor_stock: 50,
            shipping_cost_vendor_to_customer: dec!(8),
            shipping_cost_warehouse_to_customer: dec!(12),
        }
    }

    #[test]
    fn cheaper_feasible_vendor_dropships() {
        assert_eq!(decide(&inputs()), DropshipDecision::DropshipFromVendor);
    }

    #[test]
    fn ties_favor_the_warehouse() {
        let mut i = inputs();
        i.shipping_cost_vendor_to_customer = dec!(12.00);
        assert_eq!(decide(&i), DropshipDecision::ShipFromWarehouse);
    }

    #[test]
    fn only_feasible_side_wins_regardless_of_cost() {
        let mut i = inputs();
        i.warehouse_stock = 3;
        i.shipping_cost_vendor_to_customer = dec!(100);
        assert_eq!(decide(&i), DropshipDecision::DropshipFromVendor);

        let mut i = inputs();
        i.vendor_stock = 9;
        assert_eq!(decide(&i), DropshipDecision::ShipFromWarehouse);
    }

    #[test]
    fn neither_side_feasible_ships_from_warehouse() {
        let mut i = inputs();
        i.warehouse_stock = 0;
        i.vendor_stock = 0;
        assert_eq!(decide(&i), DropshipDecision::ShipFromWarehouse);
    }

    #[test]
    fn validation_rejects_bad_quantities_and_costs() {
        let mut i = inputs();
        i.ordered_quantity = 0;
        assert!(i.validate().is_err());

        let mut i = inputs();
        i.shipping_cost_warehouse_to_customer = dec!(-1);
        assert!(i.validate().is_err());

        assert!(inputs().validate().is_ok());
    }

    #[test]
    fn decision_serializes_in_snake_case() {
        let json = serde_json::to_string(&DropshipDecision::DropshipFromVendor).unwrap();
        assert_eq!(json, "\"dropship_from_vendor\"");
    }

    proptest! {
        #[test]
        fn vendor_refusal_always_ships_from_warehouse(
            qty in 1i64..1_000,
            wh in 0i64..1_000,
            vs in 0i64..1_000,
            vc in 0i64..100_000,
            wc in 0i64..100_000,
        ) {
            let i = DropshipInputs {
                ordered_quantity: qty,
                vendor_accepts_dropship: false,
                warehouse_stock: wh,
                vendor_stock: vs,
                shipping_cost_vendor_to_customer: Decimal::new(vc, 2),
                shipping_cost_warehouse_to_customer: Decimal::new(wc, 2),
                ..inputs()
            };
            prop_assert_eq!(decide(&i), DropshipDecision::ShipFromWarehouse);
        }
    }
}
