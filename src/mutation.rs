use sha2::{Digest, Sha256};
use similar::{ChangeTag, TextDiff};
use tracing::{debug, warn};

use crate::node::{ContentNode, HtmlDocument};
use crate::price::contains_price;

/// Descendants that make an added element interesting on their own
const PRICE_DESCENDANT_SELECTOR: &str = r#"[class*="total"], [class*="price"], [class*="amount"]"#;

/// Hex SHA-256 of a snapshot
pub fn snapshot_hash(html: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(html.as_bytes());
    hex::encode(hasher.finalize())
}

/// One serialized page state
#[derive(Debug, Clone)]
pub struct Snapshot {
    html: String,
    hash: String,
}

impl Snapshot {
    pub fn new(html: impl Into<String>) -> Self {
        let html = html.into();
        let hash = snapshot_hash(&html);
        Self { html, hash }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

// One "line" per tag so the line diff works at element granularity
fn tag_lines(html: &str) -> String {
    html.replace('<', "\n<")
}

/// Markup runs present in `current` but not in `previous`
pub fn added_fragments(previous: &Snapshot, current: &Snapshot) -> Vec<String> {
    if previous.hash == current.hash {
        return Vec::new();
    }

    let old = tag_lines(&previous.html);
    let new = tag_lines(&current.html);
    let diff = TextDiff::from_lines(&old, &new);

    let mut fragments = Vec::new();
    let mut run = String::new();
    for change in diff.iter_all_changes() {
        if change.tag() == ChangeTag::Insert {
            run.push_str(change.value());
        } else if !run.is_empty() {
            fragments.push(std::mem::take(&mut run));
        }
    }
    if !run.is_empty() {
        fragments.push(run);
    }

    fragments
}

/// Whether a single added element warrants a re-analysis
pub fn is_significant_node<N: ContentNode>(node: &N) -> bool {
    let text = node.text();
    if (text.contains("total") || text.contains("checkout")) && contains_price(&text) {
        return true;
    }

    match node.query(PRICE_DESCENDANT_SELECTOR) {
        Ok(found) => !found.is_empty(),
        Err(e) => {
            warn!(error = %e, "mutation selector rejected");
            false
        }
    }
}

/// Whether any element added between the two snapshots is significant
pub fn is_significant_batch(previous: &Snapshot, current: &Snapshot) -> bool {
    let fragments = added_fragments(previous, current);
    let significant = fragments.iter().any(|fragment| {
        HtmlDocument::parse_fragment(fragment)
            .top_level_elements()
            .iter()
            .any(is_significant_node)
    });
    debug!(fragments = fragments.len(), significant, "mutation batch");
    significant
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEFORE: &str = r#"<body><div class="cart"><p>Item</p></div></body>"#;

    #[test]
    fn test_unchanged_snapshot_has_no_fragments() {
        let a = Snapshot::new(BEFORE);
        let b = Snapshot::new(BEFORE);
        assert_eq!(a.hash(), b.hash());
        assert!(added_fragments(&a, &b).is_empty());
        assert!(!is_significant_batch(&a, &b));
    }

    #[test]
    fn test_added_element_is_recovered() {
        let a = Snapshot::new(BEFORE);
        let b = Snapshot::new(
            r#"<body><div class="cart"><p>Item</p></div><section id="late">Loaded</section></body>"#,
        );
        let fragments = added_fragments(&a, &b);
        assert!(fragments.iter().any(|f| f.contains(r#"<section id="late">"#)));
    }

    #[test]
    fn test_price_descendant_is_significant() {
        let a = Snapshot::new(BEFORE);
        let b = Snapshot::new(
            r#"<body><div class="cart"><p>Item</p></div><section><span class="amount">₹40</span></section></body>"#,
        );
        assert!(is_significant_batch(&a, &b));
    }

    #[test]
    fn test_total_text_with_price_is_significant() {
        let doc = HtmlDocument::parse_fragment("<p>new total ₹620</p>");
        assert!(is_significant_node(&doc.top_level_elements()[0]));

        // Capitalised "Total" alone does not qualify
        let doc = HtmlDocument::parse_fragment("<p>Total ₹620</p>");
        assert!(!is_significant_node(&doc.top_level_elements()[0]));

        let doc = HtmlDocument::parse_fragment("<p>proceed to checkout</p>");
        assert!(!is_significant_node(&doc.top_level_elements()[0]));
    }

    #[test]
    fn test_unrelated_addition_is_not_significant() {
        let a = Snapshot::new(BEFORE);
        let b = Snapshot::new(
            r#"<body><div class="cart"><p>Item</p></div><aside>Recommended for you</aside></body>"#,
        );
        assert!(!is_significant_batch(&a, &b));
    }
}
