use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{FeescopeError, Result};

/// Read-only handle into a content tree.
pub trait ContentNode: Clone + PartialEq + std::fmt::Debug {
    /// Concatenated text of this node and all its descendants
    fn text(&self) -> String;
    /// Attribute value, if present
    fn attribute(&self, name: &str) -> Option<String>;
    /// Lower-case tag name
    fn tag_name(&self) -> String;
    /// Parent element
    fn parent(&self) -> Option<Self>;
    /// Child elements in document order
    fn children(&self) -> Vec<Self>;
    /// Descendant elements (excluding self) matching a CSS selector
    fn query(&self, selector: &str) -> Result<Vec<Self>>;
    /// Whether this element matches a CSS selector
    fn matches(&self, selector: &str) -> Result<bool>;
    /// Every descendant text node in document order, paired with the
    /// element that directly contains it
    fn text_nodes(&self) -> Vec<(String, Self)>;
    /// Serialized markup of this element
    fn outer_html(&self) -> String;

    fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Checked form control (radio/checkbox rendered with `checked`)
    fn is_checked(&self) -> bool {
        self.attribute("checked").is_some()
    }

    /// Nearest ancestor-or-self matching `selector`
    fn closest(&self, selector: &str) -> Result<Option<Self>> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.matches(selector)? {
                return Ok(Some(node));
            }
            current = node.parent();
        }
        Ok(None)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| FeescopeError::SelectorError {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

/// A parsed HTML page (or fragment)
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    pub fn parse_fragment(html: &str) -> Self {
        Self {
            html: Html::parse_fragment(html),
        }
    }

    /// The document element (`<html>`)
    pub fn root(&self) -> HtmlNode<'_> {
        HtmlNode {
            element: self.html.root_element(),
        }
    }

    /// `<body>` if the page has one, otherwise the document element
    pub fn body(&self) -> HtmlNode<'_> {
        let root = self.root();
        root.query("body")
            .ok()
            .and_then(|nodes| nodes.into_iter().next())
            .unwrap_or(root)
    }

    /// Trimmed `<title>` text
    pub fn title(&self) -> Option<String> {
        let title = self.root().query("title").ok()?.into_iter().next()?.text();
        let title = title.trim();
        (!title.is_empty()).then(|| title.to_string())
    }

    /// Top-level elements of a fragment (children of the synthetic root)
    pub fn top_level_elements(&self) -> Vec<HtmlNode<'_>> {
        self.root().children()
    }
}

/// [`ContentNode`] over a `scraper` element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HtmlNode<'a> {
    element: ElementRef<'a>,
}

impl<'a> ContentNode for HtmlNode<'a> {
    fn text(&self) -> String {
        self.element.text().collect()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.element.value().attr(name).map(String::from)
    }

    fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    fn parent(&self) -> Option<Self> {
        self.element
            .parent()
            .and_then(ElementRef::wrap)
            .map(|element| HtmlNode { element })
    }

    fn children(&self) -> Vec<Self> {
        self.element
            .children()
            .filter_map(ElementRef::wrap)
            .map(|element| HtmlNode { element })
            .collect()
    }

    fn query(&self, selector: &str) -> Result<Vec<Self>> {
        let selector = parse_selector(selector)?;
        Ok(self
            .element
            .select(&selector)
            .map(|element| HtmlNode { element })
            .collect())
    }

    fn matches(&self, selector: &str) -> Result<bool> {
        let selector = parse_selector(selector)?;
        Ok(selector.matches(&self.element))
    }

    fn text_nodes(&self) -> Vec<(String, Self)> {
        self.element
            .descendants()
            .filter_map(|node| match node.value() {
                Node::Text(text) => {
                    let parent = node.parent().and_then(ElementRef::wrap)?;
                    Some((String::from(&**text), HtmlNode { element: parent }))
                }
                _ => None,
            })
            .collect()
    }

    fn outer_html(&self) -> String {
        self.element.html()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <!DOCTYPE html>
        <html>
        <head><title> Checkout | Shop </title></head>
        <body>
            <div class="summary price-box" id="sum">
                <span class="label">Subtotal</span>
                <span class="amount" data-amount="499">₹499</span>
            </div>
            <input type="radio" name="payment" checked>
        </body>
        </html>
    "#;

    #[test]
    fn test_title_and_body() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(doc.title(), Some("Checkout | Shop".to_string()));
        assert_eq!(doc.body().tag_name(), "body");
    }

    #[test]
    fn test_query_and_attributes() {
        let doc = HtmlDocument::parse(PAGE);
        let amounts = doc.root().query(".amount").unwrap();
        assert_eq!(amounts.len(), 1);
        assert_eq!(amounts[0].attribute("data-amount"), Some("499".to_string()));
        assert_eq!(amounts[0].text(), "₹499");
        assert!(amounts[0].has_class("amount"));
        assert!(!amounts[0].has_class("amo"));
    }

    #[test]
    fn test_closest_includes_self_and_ancestors() {
        let doc = HtmlDocument::parse(PAGE);
        let amount = doc.root().query(".amount").unwrap().remove(0);
        let own = amount.closest("[class*=\"amount\"]").unwrap().unwrap();
        assert_eq!(own, amount);
        let container = amount.closest("[class*=\"price\"]").unwrap().unwrap();
        assert_eq!(container.attribute("id"), Some("sum".to_string()));
        assert!(amount.closest(".missing").unwrap().is_none());
    }

    #[test]
    fn test_text_nodes_report_direct_parent() {
        let doc = HtmlDocument::parse(PAGE);
        let nodes = doc.body().text_nodes();
        let (_, parent) = nodes
            .iter()
            .find(|(text, _)| text.contains("Subtotal"))
            .unwrap();
        assert!(parent.has_class("label"));
    }

    #[test]
    fn test_checked_radio() {
        let doc = HtmlDocument::parse(PAGE);
        let radio = doc.root().query("input[type=\"radio\"]").unwrap().remove(0);
        assert!(radio.is_checked());
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let doc = HtmlDocument::parse(PAGE);
        let err = doc.root().query("div[").unwrap_err();
        assert!(matches!(err, FeescopeError::SelectorError { .. }));
    }

    #[test]
    fn test_fragment_top_level_elements() {
        let doc = HtmlDocument::parse_fragment("<div class=\"a\">x</div><p>y</p>");
        let tops = doc.top_level_elements();
        assert_eq!(tops.len(), 2);
        assert_eq!(tops[1].tag_name(), "p");
    }
}
