//! One analysis pass over a page
//!
//! For every searched field: locate candidates, classify them, filter by
//! plausibility and select one. The selected values are then reconciled into
//! an [`AnalysisResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::FeescopeError;
use crate::locate::locate_candidates;
use crate::node::{ContentNode, HtmlDocument};
use crate::price::detect_currency;
use crate::reconcile::{reconcile, Fees};
use crate::rules::{ExtractionRules, FieldCategory};
use crate::select::select_best;

/// Characters of markup kept as a breakdown entry's source
const SNIPPET_CHARS: usize = 200;

/// Totals above this are worth showing even without hidden charges
const NOTEWORTHY_TOTAL: f64 = 10.0;

/// One resolved field, with the markup it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdownEntry {
    pub label: String,
    pub amount: f64,
    pub source_snippet: String,
    pub is_hidden: bool,
}

/// Selected values before reconciliation. `None` means nothing was selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub base_price: Option<f64>,
    pub delivery_fee: Option<f64>,
    pub convenience_fee: Option<f64>,
    pub taxes: Option<f64>,
    pub total: Option<f64>,
    /// Resolved fields in discovery order
    pub breakdown: Vec<PriceBreakdownEntry>,
}

impl ExtractedFields {
    pub fn get(&self, category: FieldCategory) -> Option<f64> {
        match category {
            FieldCategory::BasePrice => self.base_price,
            FieldCategory::DeliveryFee => self.delivery_fee,
            FieldCategory::ConvenienceFee => self.convenience_fee,
            FieldCategory::Taxes => self.taxes,
            FieldCategory::Total => self.total,
        }
    }

    fn set(&mut self, category: FieldCategory, value: f64) {
        let slot = match category {
            FieldCategory::BasePrice => &mut self.base_price,
            FieldCategory::DeliveryFee => &mut self.delivery_fee,
            FieldCategory::ConvenienceFee => &mut self.convenience_fee,
            FieldCategory::Taxes => &mut self.taxes,
            FieldCategory::Total => &mut self.total,
        };
        *slot = Some(value);
    }

    /// Reconciliation input; unresolved fields count as zero
    pub fn to_fees(&self) -> Fees {
        Fees {
            base_price: self.base_price.unwrap_or(0.0),
            delivery_fee: self.delivery_fee.unwrap_or(0.0),
            convenience_fee: self.convenience_fee.unwrap_or(0.0),
            taxes: self.taxes.unwrap_or(0.0),
            other_fees: 0.0,
            total: self.total.unwrap_or(0.0),
        }
    }
}

/// Page-level facts attached to every result
#[derive(Debug, Clone, PartialEq)]
pub struct PageMeta {
    pub site: String,
    pub page_title: String,
    pub currency_symbol: String,
}

impl PageMeta {
    /// Gather title and currency from a parsed page
    pub fn from_document(doc: &HtmlDocument, site: &str, default_currency: &str) -> Self {
        let currency_symbol = detect_currency(&doc.body().text())
            .map(String::from)
            .unwrap_or_else(|| default_currency.to_string());
        Self {
            site: site.to_string(),
            page_title: doc.title().unwrap_or_default(),
            currency_symbol,
        }
    }
}

/// Outcome of a pass, in the shape collaborators consume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub base_price: f64,
    pub delivery_fee: f64,
    pub convenience_fee: f64,
    pub taxes: f64,
    pub other_fees: f64,
    pub total: f64,
    pub hidden_charges: f64,
    pub hidden_percentage: u32,
    pub currency_symbol: String,
    pub site: String,
    pub page_title: String,
    pub analyzed_at: DateTime<Utc>,
    pub breakdown: Vec<PriceBreakdownEntry>,
}

impl AnalysisResult {
    /// All-zero result for a page
    pub fn empty(meta: &PageMeta) -> Self {
        Self {
            base_price: 0.0,
            delivery_fee: 0.0,
            convenience_fee: 0.0,
            taxes: 0.0,
            other_fees: 0.0,
            total: 0.0,
            hidden_charges: 0.0,
            hidden_percentage: 0,
            currency_symbol: meta.currency_symbol.clone(),
            site: meta.site.clone(),
            page_title: meta.page_title.clone(),
            analyzed_at: Utc::now(),
            breakdown: Vec::new(),
        }
    }

    /// Anything was found at all
    pub fn has_pricing(&self) -> bool {
        !self.breakdown.is_empty() || self.total > 0.0 || self.hidden_charges > 0.0
    }

    /// Worth surfacing to the user on first sight
    pub fn is_noteworthy(&self) -> bool {
        self.hidden_charges > 0.0 || self.total > NOTEWORTHY_TOTAL
    }
}

/// Error payload: the empty result for the page, flagged with the failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisError {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub error: String,
    pub has_error: bool,
}

impl AnalysisError {
    pub fn new(meta: &PageMeta, error: &FeescopeError) -> Self {
        Self {
            result: AnalysisResult::empty(meta),
            error: error.to_string(),
            has_error: true,
        }
    }
}

/// Messages handed to the rendering collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EngineMessage {
    #[serde(rename = "HIDDEN_FEES_DETECTED")]
    HiddenFeesDetected(AnalysisResult),
    #[serde(rename = "ANALYSIS_ERROR")]
    AnalysisError(AnalysisError),
}

fn snippet(markup: &str) -> String {
    markup.chars().take(SNIPPET_CHARS).collect()
}

/// Locate, classify, filter and select every searched field.
///
/// `root` is the whole document; `body` scopes the text-search fallback.
pub fn extract_fields<N: ContentNode>(
    root: &N,
    body: &N,
    rules: &ExtractionRules,
) -> ExtractedFields {
    let mut fields = ExtractedFields::default();

    for category in FieldCategory::ALL {
        let candidates = locate_candidates(root, body, category, rules.for_category(category));
        let Some(best) = select_best(&candidates, category) else {
            debug!(%category, "no candidate selected");
            continue;
        };

        debug!(%category, value = best.value, method = ?best.discovery_method, "selected");
        fields.set(category, best.value);
        fields.breakdown.push(PriceBreakdownEntry {
            label: category.label().to_string(),
            amount: best.value,
            source_snippet: snippet(&best.node.outer_html()),
            is_hidden: category.is_hidden(),
        });
    }

    fields
}

/// Run the full pipeline over an already-loaded content tree.
pub fn analyze<N: ContentNode>(
    root: &N,
    body: &N,
    meta: &PageMeta,
    rules: &ExtractionRules,
) -> AnalysisResult {
    let fields = extract_fields(root, body, rules);
    let reconciled = reconcile(fields.to_fees());

    let result = AnalysisResult {
        base_price: reconciled.fees.base_price,
        delivery_fee: reconciled.fees.delivery_fee,
        convenience_fee: reconciled.fees.convenience_fee,
        taxes: reconciled.fees.taxes,
        other_fees: reconciled.fees.other_fees,
        total: reconciled.fees.total,
        hidden_charges: reconciled.hidden_charges,
        hidden_percentage: reconciled.hidden_percentage,
        breakdown: fields.breakdown,
        ..AnalysisResult::empty(meta)
    };

    info!(
        site = %result.site,
        base = result.base_price,
        total = result.total,
        hidden = result.hidden_charges,
        pct = result.hidden_percentage,
        "analysis pass complete"
    );

    result
}

/// Convenience wrapper for a parsed HTML page
pub fn analyze_document(
    doc: &HtmlDocument,
    site: &str,
    rules: &ExtractionRules,
    default_currency: &str,
) -> AnalysisResult {
    let meta = PageMeta::from_document(doc, site, default_currency);
    analyze(&doc.root(), &doc.body(), &meta, rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKOUT: &str = r#"
        <html><head><title>Checkout</title></head>
        <body>
            <div class="item">Item Price: ₹499</div>
            <div class="fee">Delivery Fee: ₹40</div>
            <div class="summary">Total: ₹539</div>
        </body></html>
    "#;

    fn run(html: &str) -> AnalysisResult {
        let doc = HtmlDocument::parse(html);
        analyze_document(&doc, "shop.example", &ExtractionRules::default(), "₹")
    }

    #[test]
    fn test_text_fallback_checkout() {
        let result = run(CHECKOUT);
        assert_eq!(result.base_price, 499.0);
        assert_eq!(result.delivery_fee, 40.0);
        assert_eq!(result.total, 539.0);
        assert_eq!(result.hidden_charges, 40.0);
        assert_eq!(result.hidden_percentage, 8);
        assert_eq!(result.other_fees, 0.0);
        assert_eq!(result.page_title, "Checkout");
        assert_eq!(result.currency_symbol, "₹");
    }

    #[test]
    fn test_breakdown_order_and_flags() {
        let result = run(CHECKOUT);
        let labels: Vec<_> = result.breakdown.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Base Price", "Delivery Fee", "Total"]);
        assert!(!result.breakdown[0].is_hidden);
        assert!(result.breakdown[1].is_hidden);
        assert!(result.breakdown[1].source_snippet.contains("Delivery Fee"));
    }

    #[test]
    fn test_snippet_is_capped_on_char_boundary() {
        let long = format!("<p>{}</p>", "₹".repeat(300));
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), SNIPPET_CHARS);
    }

    #[test]
    fn test_selector_driven_page() {
        let result = run(
            r#"<body>
                <span class="product-price">$1,200.00</span>
                <span class="shipping-cost">$25</span>
                <span class="tax-line">$96</span>
                <span class="grand-total">$1,321.00</span>
            </body>"#,
        );
        assert_eq!(result.currency_symbol, "$");
        assert_eq!(result.base_price, 1200.0);
        assert_eq!(result.delivery_fee, 25.0);
        assert_eq!(result.taxes, 96.0);
        assert_eq!(result.total, 1321.0);
        assert_eq!(result.hidden_charges, 121.0);
        assert_eq!(result.hidden_percentage, 10);
    }

    #[test]
    fn test_page_without_prices() {
        let result = run("<body><p>Your cart is empty</p></body>");
        assert!(!result.has_pricing());
        assert!(!result.is_noteworthy());
        assert_eq!(result.currency_symbol, "₹");
    }

    #[test]
    fn test_extracted_fields_keep_unresolved_as_none() {
        let doc = HtmlDocument::parse(CHECKOUT);
        let fields = extract_fields(&doc.root(), &doc.body(), &ExtractionRules::default());
        assert_eq!(fields.get(FieldCategory::BasePrice), Some(499.0));
        assert_eq!(fields.get(FieldCategory::Taxes), None);
        assert_eq!(fields.to_fees().taxes, 0.0);
    }

    #[test]
    fn test_error_payload_shape() {
        let meta = PageMeta {
            site: "shop.example".into(),
            page_title: String::new(),
            currency_symbol: "₹".into(),
        };
        let payload = AnalysisError::new(&meta, &FeescopeError::SourceError("gone".into()));
        let json = serde_json::to_value(EngineMessage::AnalysisError(payload)).unwrap();
        assert_eq!(json["type"], "ANALYSIS_ERROR");
        assert_eq!(json["data"]["hasError"], true);
        assert_eq!(json["data"]["hiddenCharges"], 0.0);
        assert_eq!(json["data"]["site"], "shop.example");
        assert!(json["data"]["error"].as_str().unwrap().contains("gone"));
    }
}
