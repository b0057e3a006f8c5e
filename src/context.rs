use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::node::ContentNode;
use crate::rules::FieldCategory;

/// Ancestors whose class names suggest a monetary container
const MONEY_CONTAINER_SELECTOR: &str = r#"[class*="price"], [class*="amount"], [class*="cost"], [class*="fee"], [class*="total"]"#;

static DELIVERY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"delivery|shipping|courier").expect("Invalid delivery regex"));
static CONVENIENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"convenience|handling|processing|service|platform")
        .expect("Invalid convenience regex")
});
static TAX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"tax|gst|vat").expect("Invalid tax regex"));
static TOTAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"total|grand|final|amount").expect("Invalid total regex"));
static BASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"price|cost|mrp|item").expect("Invalid base regex"));

/// Keyword tags of a candidate's textual neighbourhood
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Context {
    /// Lower-cased neighbourhood text
    pub raw_text: String,
    pub has_delivery_keywords: bool,
    pub has_convenience_keywords: bool,
    pub has_tax_keywords: bool,
    pub has_total_keywords: bool,
    pub has_base_keywords: bool,
}

impl Context {
    /// Tag already lower-cased text
    pub fn from_text(text: String) -> Self {
        Self {
            has_delivery_keywords: DELIVERY_RE.is_match(&text),
            has_convenience_keywords: CONVENIENCE_RE.is_match(&text),
            has_tax_keywords: TAX_RE.is_match(&text),
            has_total_keywords: TOTAL_RE.is_match(&text),
            has_base_keywords: BASE_RE.is_match(&text),
            raw_text: text,
        }
    }

    /// Whether the tags agree with the requested category
    pub fn is_relevant(&self, category: FieldCategory) -> bool {
        match category {
            FieldCategory::DeliveryFee => self.has_delivery_keywords,
            FieldCategory::ConvenienceFee => self.has_convenience_keywords,
            FieldCategory::Taxes => self.has_tax_keywords,
            FieldCategory::Total => self.has_total_keywords,
            FieldCategory::BasePrice => self.has_base_keywords,
        }
    }
}

/// Classify `node` by the text of its nearest money-container ancestor,
/// falling back to its parent and then to the node itself.
pub fn classify<N: ContentNode>(node: &N) -> Context {
    let container = match node.closest(MONEY_CONTAINER_SELECTOR) {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "context selector rejected");
            None
        }
    };

    let text = container
        .or_else(|| node.parent())
        .unwrap_or_else(|| node.clone())
        .text()
        .to_lowercase();

    Context::from_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::HtmlDocument;

    #[test]
    fn test_keyword_tags() {
        let ctx = Context::from_text("shipping & handling charges incl. gst".into());
        assert!(ctx.has_delivery_keywords);
        assert!(ctx.has_convenience_keywords);
        assert!(ctx.has_tax_keywords);
        assert!(!ctx.has_total_keywords);
        assert!(!ctx.has_base_keywords);
        assert!(ctx.is_relevant(FieldCategory::Taxes));
        assert!(!ctx.is_relevant(FieldCategory::Total));
    }

    #[test]
    fn test_classify_uses_money_container() {
        let doc = HtmlDocument::parse(
            r#"<body><section>Order summary
                <div class="fee-row"><span>Platform</span><b id="v">₹9</b></div>
            </section></body>"#,
        );
        let value = doc.root().query("#v").unwrap().remove(0);
        let ctx = classify(&value);
        assert_eq!(ctx.raw_text, "platform₹9");
        assert!(ctx.is_relevant(FieldCategory::ConvenienceFee));
    }

    #[test]
    fn test_classify_falls_back_to_parent() {
        let doc = HtmlDocument::parse(
            r#"<body><p>Shipping <b id="v">₹40</b></p></body>"#,
        );
        let value = doc.root().query("#v").unwrap().remove(0);
        let ctx = classify(&value);
        assert_eq!(ctx.raw_text, "shipping ₹40");
        assert!(ctx.has_delivery_keywords);
    }
}
