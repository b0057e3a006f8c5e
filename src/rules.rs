use serde::{Deserialize, Serialize};

use crate::price::MAX_PRICE;

/// Lower bound every extracted value must clear, whatever its category
pub const GLOBAL_MIN_PRICE: f64 = 0.01;

/// The directly searched fields of a checkout breakdown. Other fees are
/// derived during reconciliation and never searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    BasePrice,
    DeliveryFee,
    ConvenienceFee,
    Taxes,
    Total,
}

impl FieldCategory {
    /// Search order of an analysis pass; also the breakdown order
    pub const ALL: [FieldCategory; 5] = [
        FieldCategory::BasePrice,
        FieldCategory::DeliveryFee,
        FieldCategory::ConvenienceFee,
        FieldCategory::Taxes,
        FieldCategory::Total,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FieldCategory::BasePrice => "Base Price",
            FieldCategory::DeliveryFee => "Delivery Fee",
            FieldCategory::ConvenienceFee => "Convenience Fee",
            FieldCategory::Taxes => "Taxes",
            FieldCategory::Total => "Total",
        }
    }

    /// Fees layered on top of the base price count as hidden
    pub fn is_hidden(self) -> bool {
        !matches!(self, FieldCategory::BasePrice | FieldCategory::Total)
    }

    /// Inclusive per-category range
    pub fn bounds(self) -> (f64, f64) {
        match self {
            FieldCategory::BasePrice => (1.0, 50_000.0),
            FieldCategory::DeliveryFee => (0.0, 500.0),
            FieldCategory::ConvenienceFee => (0.0, 200.0),
            FieldCategory::Taxes => (0.0, 5_000.0),
            FieldCategory::Total => (1.0, 100_000.0),
        }
    }

    /// Plausibility filter: the global bound and then the category bound
    pub fn accepts(self, price: f64) -> bool {
        if !(GLOBAL_MIN_PRICE..=MAX_PRICE).contains(&price) {
            return false;
        }
        let (min, max) = self.bounds();
        (min..=max).contains(&price)
    }
}

impl std::fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Selector and phrase tables for one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRules {
    /// Structural selectors, tried in order
    #[serde(default)]
    pub selectors: Vec<String>,
    /// Literal phrases for the text-search fallback (case-insensitive)
    #[serde(default)]
    pub phrases: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Lookup tables for every searched category.
///
/// The defaults cover the common checkout markup conventions; a config file
/// can replace any category's table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionRules {
    #[serde(default = "default_base_price")]
    pub base_price: CategoryRules,
    #[serde(default = "default_delivery_fee")]
    pub delivery_fee: CategoryRules,
    #[serde(default = "default_convenience_fee")]
    pub convenience_fee: CategoryRules,
    #[serde(default = "default_taxes")]
    pub taxes: CategoryRules,
    #[serde(default = "default_total")]
    pub total: CategoryRules,
}

impl ExtractionRules {
    pub fn for_category(&self, category: FieldCategory) -> &CategoryRules {
        match category {
            FieldCategory::BasePrice => &self.base_price,
            FieldCategory::DeliveryFee => &self.delivery_fee,
            FieldCategory::ConvenienceFee => &self.convenience_fee,
            FieldCategory::Taxes => &self.taxes,
            FieldCategory::Total => &self.total,
        }
    }
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            base_price: default_base_price(),
            delivery_fee: default_delivery_fee(),
            convenience_fee: default_convenience_fee(),
            taxes: default_taxes(),
            total: default_total(),
        }
    }
}

fn default_base_price() -> CategoryRules {
    CategoryRules {
        selectors: strings(&[
            r#"[data-testid*="price"]"#,
            r#"[class*="base-price"]"#,
            r#"[class*="item-price"]"#,
            r#"[class*="product-price"]"#,
            r#"[class*="subtotal"]"#,
            r#".price:not([class*="total"])"#,
            r#".amount:not([class*="total"])"#,
            r#"[id*="subtotal"]"#,
            r#"[id*="item-price"]"#,
        ]),
        phrases: strings(&[
            "Item Price",
            "Product Price",
            "Base Price",
            "MRP",
            "Price:",
            "Cost:",
            "Amount:",
            "Subtotal",
        ]),
    }
}

fn default_delivery_fee() -> CategoryRules {
    CategoryRules {
        selectors: strings(&[
            r#"[class*="delivery"]"#,
            r#"[class*="shipping"]"#,
            r#"[data-testid*="delivery"]"#,
            r#"[data-testid*="shipping"]"#,
            r#"[id*="delivery"]"#,
            r#"[id*="shipping"]"#,
        ]),
        phrases: strings(&[
            "Delivery Fee",
            "Shipping Fee",
            "Delivery Charge",
            "Shipping Charge",
            "Courier Fee",
            "Delivery:",
            "Shipping:",
        ]),
    }
}

fn default_convenience_fee() -> CategoryRules {
    CategoryRules {
        selectors: strings(&[
            r#"[class*="convenience"]"#,
            r#"[class*="handling"]"#,
            r#"[class*="processing"]"#,
            r#"[class*="service"]"#,
            r#"[data-testid*="convenience"]"#,
            r#"[data-testid*="handling"]"#,
        ]),
        phrases: strings(&[
            "Convenience Fee",
            "Handling Fee",
            "Processing Fee",
            "Service Fee",
            "Platform Fee",
            "Convenience:",
            "Handling:",
            "Processing:",
        ]),
    }
}

fn default_taxes() -> CategoryRules {
    CategoryRules {
        selectors: strings(&[
            r#"[class*="tax"]"#,
            r#"[class*="gst"]"#,
            r#"[class*="vat"]"#,
            r#"[data-testid*="tax"]"#,
            r#"[id*="tax"]"#,
        ]),
        phrases: strings(&["Tax", "GST", "VAT", "CGST", "SGST", "IGST", "Taxes:", "Tax Amount"]),
    }
}

fn default_total() -> CategoryRules {
    CategoryRules {
        selectors: strings(&[
            r#"[class*="total"]"#,
            r#"[class*="grand-total"]"#,
            r#"[class*="final-amount"]"#,
            r#"[data-testid*="total"]"#,
            r#"[id*="total"]"#,
        ]),
        phrases: strings(&[
            "Total",
            "Grand Total",
            "Final Amount",
            "Order Total",
            "Amount Payable",
            "Total Amount",
            "Total:",
        ]),
    }
}
