use once_cell::sync::Lazy;
use regex::Regex;

/// Currency glyphs recognised on checkout pages
pub const CURRENCY_SYMBOLS: [char; 5] = ['₹', '$', '€', '£', '¥'];

/// Largest value any extracted price may take
pub const MAX_PRICE: f64 = 100_000.0;

static PRICE_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d{1,2})?)").expect("Invalid price run regex")
});

// Patterns that make a text fragment look like it carries money
static MONEY_SHAPED_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"[₹$€£¥]\s*\d+(?:\.\d{1,2})?",
        r"\d+(?:\.\d{1,2})?\s*[₹$€£¥]",
        r"\d+\.\d{2}(?:[^\d]|$)",
        r"\d{1,3}(?:,\d{3})*(?:\.\d{2})?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid money pattern"))
    .collect()
});

/// Parse the first plausible price in `text`.
///
/// Returns `None` when no digit run exists at all. Negative amounts, values
/// above [`MAX_PRICE`] and anything that would render in exponential form
/// come back as `Some(0.0)`: a number was present but it is not a usable price.
/// The exponential check applies to the parsed value; an `e` in the text is
/// stripped like any other letter.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c))
        .filter(|c| *c != ',' && !c.is_whitespace())
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let (is_negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };

    let run = PRICE_RUN_RE.captures(unsigned)?.get(1)?.as_str();
    let price: f64 = run.parse().ok()?;

    if price.is_nan() || price < 0.0 || price > MAX_PRICE || renders_exponential(price) {
        return Some(0.0);
    }

    Some(if is_negative { 0.0 } else { price })
}

/// [`parse_price`] with "nothing found" folded into zero
pub fn price_or_zero(text: &str) -> f64 {
    parse_price(text).unwrap_or(0.0)
}

/// Finite, non-negative, within [`MAX_PRICE`], and printable without an exponent.
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price >= 0.0 && price <= MAX_PRICE && !renders_exponential(price)
}

/// Whether `text` contains something money-shaped (a currency amount or a
/// decimal/comma-grouped number).
pub fn contains_price(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    MONEY_SHAPED_RES.iter().any(|re| re.is_match(text))
}

/// Scan `text` for the first currency glyph, if any.
pub fn detect_currency(text: &str) -> Option<char> {
    text.chars().find(|c| CURRENCY_SYMBOLS.contains(c))
}

/// Number-to-string conversions switch to exponent notation outside
/// [1e-6, 1e21); such values never come from a real price label.
fn renders_exponential(value: f64) -> bool {
    let magnitude = value.abs();
    magnitude != 0.0 && (magnitude < 1e-6 || magnitude >= 1e21)
}

/// Format an amount the way it is shown to users: integers without a
/// fraction, everything else with two decimals.
pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbol_prefixed_prices() {
        for sym in CURRENCY_SYMBOLS {
            for (int, frac) in [(0u32, "5"), (7, "25"), (499, "9"), (1234, "50"), (99999, "99")] {
                let text = format!("{}{}.{}", sym, int, frac);
                let expected: f64 = format!("{}.{}", int, frac).parse().unwrap();
                assert_eq!(parse_price(&text), Some(expected), "input {}", text);
            }
        }
    }

    #[test]
    fn test_parse_labelled_text() {
        assert_eq!(parse_price("Item Price: ₹499"), Some(499.0));
        assert_eq!(parse_price("Delivery Fee: ₹40"), Some(40.0));
        assert_eq!(parse_price("₹ 1,299.00"), Some(1299.0));
        assert_eq!(parse_price("Total\u{a0}$12.5"), Some(12.5));
    }

    #[test]
    fn test_parse_truncates_extra_decimals() {
        assert_eq!(parse_price("$10.999"), Some(10.99));
    }

    #[test]
    fn test_parse_negative_is_zero() {
        assert_eq!(parse_price("-₹40"), Some(0.0));
        assert_eq!(parse_price("₹-40"), Some(0.0));
        assert_eq!(parse_price("- 12.50"), Some(0.0));
    }

    #[test]
    fn test_parse_over_cap_is_zero() {
        assert_eq!(parse_price("₹100001"), Some(0.0));
        assert_eq!(parse_price("₹2,50,000"), Some(0.0));
        assert_eq!(parse_price("₹100000"), Some(100_000.0));
    }

    #[test]
    fn test_parse_exponent_marker_is_stripped() {
        // Digits either side of the marker are glued together
        assert_eq!(parse_price("1e25"), Some(125.0));
        assert_eq!(parse_price("9e999999"), Some(0.0));
    }

    #[test]
    fn test_parse_no_digits() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("Free"), None);
        assert_eq!(parse_price("₹"), None);
        assert_eq!(price_or_zero("Free"), 0.0);
    }

    #[test]
    fn test_is_valid_price() {
        assert!(is_valid_price(0.0));
        assert!(is_valid_price(49.99));
        assert!(is_valid_price(MAX_PRICE));
        assert!(!is_valid_price(MAX_PRICE + 0.01));
        assert!(!is_valid_price(-1.0));
        assert!(!is_valid_price(f64::NAN));
        assert!(!is_valid_price(f64::INFINITY));
        assert!(!is_valid_price(1e-7));
    }

    #[test]
    fn test_contains_price() {
        assert!(contains_price("Grand total ₹539"));
        assert!(contains_price("539 €"));
        assert!(contains_price("amount 12.50"));
        assert!(contains_price("1,299"));
        assert!(!contains_price("Proceed to checkout"));
        assert!(!contains_price(""));
    }

    #[test]
    fn test_detect_currency() {
        assert_eq!(detect_currency("Total: $12"), Some('$'));
        assert_eq!(detect_currency("no money here"), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(40.0), "40");
        assert_eq!(format_amount(12.5), "12.50");
    }
}
