use serde::Serialize;
use tracing::{debug, warn};

use crate::context::{classify, Context};
use crate::node::ContentNode;
use crate::price::{is_valid_price, price_or_zero};
use crate::rules::{CategoryRules, FieldCategory};

/// Descendants that often hold the figure when a container's own text does not
const PRICE_LOOKING_SELECTOR: &str = r#"[class*="price"], [class*="amount"], [class*="cost"]"#;

/// Attributes consulted when an element's text carries no price
const VALUE_ATTRIBUTES: [&str; 3] = ["data-price", "data-amount", "value"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    Selector,
    Text,
}

/// A tentative value for one field, prior to selection
#[derive(Debug, Clone)]
pub struct PriceCandidate<N> {
    pub value: f64,
    pub node: N,
    pub discovery_method: DiscoveryMethod,
    pub context: Context,
}

/// Value of an element: its text, then its value attributes, then the largest
/// price-looking descendant. The first tier that yields a non-zero value wins.
pub fn element_price<N: ContentNode>(node: &N) -> f64 {
    let mut price = price_or_zero(&node.text());

    if price == 0.0 {
        let attr_value = VALUE_ATTRIBUTES
            .iter()
            .filter_map(|name| node.attribute(name))
            .find(|value| !value.is_empty());
        if let Some(value) = attr_value {
            price = price_or_zero(&value);
        }
    }

    if price == 0.0 {
        match node.query(PRICE_LOOKING_SELECTOR) {
            Ok(descendants) => {
                for descendant in descendants {
                    let child_price = price_or_zero(&descendant.text());
                    if child_price > price {
                        price = child_price;
                    }
                }
            }
            Err(e) => warn!(error = %e, "descendant price selector rejected"),
        }
    }

    if is_valid_price(price) {
        price
    } else {
        0.0
    }
}

/// Elements whose own text nodes mention `phrase` (case-insensitive), in
/// document order and without duplicates.
pub fn elements_by_text<N: ContentNode>(scope: &N, phrase: &str) -> Vec<N> {
    let needle = phrase.to_lowercase();
    let mut elements: Vec<N> = Vec::new();

    for (text, parent) in scope.text_nodes() {
        if text.to_lowercase().contains(&needle) && !elements.contains(&parent) {
            elements.push(parent);
        }
    }

    elements
}

fn keep_candidate<N: ContentNode>(
    node: N,
    category: FieldCategory,
    method: DiscoveryMethod,
) -> Option<PriceCandidate<N>> {
    let value = element_price(&node);
    if value > 0.0 && is_valid_price(value) && category.accepts(value) {
        let context = classify(&node);
        Some(PriceCandidate {
            value,
            node,
            discovery_method: method,
            context,
        })
    } else {
        None
    }
}

/// Locate every plausible candidate for `category`.
///
/// `root` is searched with the structural selectors; `text_scope` (normally
/// `<body>`) is walked for the fallback phrases.
pub fn locate_candidates<N: ContentNode>(
    root: &N,
    text_scope: &N,
    category: FieldCategory,
    rules: &CategoryRules,
) -> Vec<PriceCandidate<N>> {
    let mut candidates = Vec::new();

    for selector in &rules.selectors {
        let nodes = match root.query(selector) {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(%category, error = %e, "skipping selector");
                continue;
            }
        };
        candidates.extend(
            nodes
                .into_iter()
                .filter_map(|node| keep_candidate(node, category, DiscoveryMethod::Selector)),
        );
    }

    if candidates.is_empty() {
        for phrase in &rules.phrases {
            candidates.extend(
                elements_by_text(text_scope, phrase)
                    .into_iter()
                    .filter_map(|node| keep_candidate(node, category, DiscoveryMethod::Text)),
            );
        }
    }

    debug!(
        %category,
        count = candidates.len(),
        values = ?candidates.iter().map(|c| c.value).collect::<Vec<_>>(),
        "located candidates"
    );

    candidates
}
