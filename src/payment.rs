use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::locate::element_price;
use crate::node::ContentNode;
use crate::price::price_or_zero;

const PAYMENT_SELECTORS: [&str; 7] = [
    r#"input[type="radio"][name*="payment"]"#,
    r#"input[type="radio"][name*="paymentMethod"]"#,
    ".payment-method.selected",
    ".payment-option.active",
    r#"[data-testid*="payment"]"#,
    ".selected-payment",
    ".payment-selected",
];

/// Body phrases that mean a payment method has been chosen (case-sensitive)
const PAYMENT_PHRASES: [&str; 4] = ["Payment Method Selected", "Selected Payment", "Pay with", "Payment via"];

const FINAL_AMOUNT_SELECTORS: [&str; 7] = [
    ".final-amount",
    ".grand-total",
    ".total-amount",
    ".checkout-total",
    r#"[data-testid*="final"]"#,
    r#"[data-testid*="grand-total"]"#,
    ".order-total",
];

const FINAL_AMOUNT_PHRASES: [&str; 4] = ["Total:", "Grand Total:", "Final Amount:", "Order Total:"];

const PAYMENT_OPTION_SELECTOR: &str =
    r#".payment-method, .payment-option, [data-testid*="payment"], input[name*="payment"]"#;
const PAYMENT_CONTAINER_SELECTOR: &str = ".payment-method, .payment-option, .payment-container";

static PAYMENT_FEE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[+]?\s*[₹$€£¥]\s*(\d+\.?\d*)|(\d+\.?\d*)\s*[₹$€£¥]")
        .expect("Invalid payment fee regex")
});

/// What one poll tick saw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Observation {
    pub payment_method_selected: bool,
    pub final_amount_present: bool,
}

/// A payment choice offered on the page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodOption {
    pub name: String,
    pub candidate_fees: Vec<f64>,
    pub is_selected: bool,
}

impl PaymentMethodOption {
    /// The surcharge this option is assumed to carry
    pub fn fee(&self) -> f64 {
        self.candidate_fees.iter().copied().fold(0.0, f64::max)
    }
}

/// A cheaper alternative to the selected payment method
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSuggestion {
    pub current: String,
    pub current_fee: f64,
    pub better: String,
    pub better_fee: f64,
    pub savings: f64,
}

fn is_selected<N: ContentNode>(node: &N) -> bool {
    node.is_checked() || node.has_class("selected") || node.has_class("active")
}

fn query_or_warn<N: ContentNode>(root: &N, selector: &str) -> Vec<N> {
    root.query(selector).unwrap_or_else(|e| {
        warn!(error = %e, "probe selector rejected");
        Vec::new()
    })
}

/// Whether the page shows a selected payment method
pub fn detect_payment_method<N: ContentNode>(root: &N, body_text: &str) -> bool {
    let by_selector = PAYMENT_SELECTORS
        .iter()
        .any(|selector| query_or_warn(root, selector).iter().any(is_selected));

    by_selector || PAYMENT_PHRASES.iter().any(|phrase| body_text.contains(phrase))
}

/// Whether the page shows a final payable amount
pub fn detect_final_amount<N: ContentNode>(root: &N, body_text: &str) -> bool {
    let by_selector = FINAL_AMOUNT_SELECTORS.iter().any(|selector| {
        query_or_warn(root, selector)
            .iter()
            .any(|node| element_price(node) > 0.0)
    });

    by_selector || FINAL_AMOUNT_PHRASES.iter().any(|phrase| body_text.contains(phrase))
}

/// Run both probes
pub fn observe<N: ContentNode>(root: &N, body: &N) -> Observation {
    let body_text = body.text();
    let observation = Observation {
        payment_method_selected: detect_payment_method(root, &body_text),
        final_amount_present: detect_final_amount(root, &body_text),
    };
    debug!(?observation, "probed page");
    observation
}

fn option_fees<N: ContentNode>(node: &N) -> Vec<f64> {
    let container = node.closest(PAYMENT_CONTAINER_SELECTOR).ok().flatten();
    let text = container
        .or_else(|| node.parent())
        .map(|n| n.text())
        .unwrap_or_else(|| node.text());

    let fees: Vec<f64> = PAYMENT_FEE_RE
        .find_iter(&text)
        .map(|m| price_or_zero(m.as_str()))
        .collect();

    if fees.is_empty() {
        vec![0.0]
    } else {
        fees
    }
}

/// Every payment option the page offers, in document order
pub fn payment_options<N: ContentNode>(root: &N) -> Vec<PaymentMethodOption> {
    query_or_warn(root, PAYMENT_OPTION_SELECTOR)
        .into_iter()
        .filter_map(|node| {
            let text = node.text();
            let name = if !text.is_empty() {
                text
            } else {
                node.attribute("value")
                    .filter(|v| !v.is_empty())
                    .or_else(|| node.attribute("data-payment-type"))
                    .unwrap_or_default()
            };
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(PaymentMethodOption {
                name: name.to_string(),
                candidate_fees: option_fees(&node),
                is_selected: is_selected(&node),
            })
        })
        .collect()
}

/// Suggest switching to the cheapest unselected option when it saves money
pub fn suggest_cheaper_method(options: &[PaymentMethodOption]) -> Option<PaymentSuggestion> {
    if options.len() <= 1 {
        return None;
    }

    let current = options.iter().find(|o| o.is_selected)?;
    let better = options
        .iter()
        .filter(|o| !o.is_selected)
        .reduce(|best, o| if o.fee() < best.fee() { o } else { best })?;

    let savings = current.fee() - better.fee();
    (savings > 0.0).then(|| PaymentSuggestion {
        current: current.name.clone(),
        current_fee: current.fee(),
        better: better.name.clone(),
        better_fee: better.fee(),
        savings,
    })
}
