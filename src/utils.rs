//! Shared utility functions

use std::time::Duration;

use feescope::error::{FeescopeError, Result};

/// Duration parser - supports "30s", "5m", "2h" or plain seconds
pub fn parse_duration(s: &str) -> Option<u64> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Some(secs);
    }

    let (num_str, unit) = if let Some(n) = s.strip_suffix('s') {
        (n, 1u64)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60u64)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600u64)
    } else {
        return None;
    };

    num_str.parse::<u64>().ok().map(|n| n * unit)
}

/// Parse a --linger value into a Duration
pub fn parse_linger(s: &str) -> Result<Duration> {
    parse_duration(s).map(Duration::from_secs).ok_or_else(|| {
        FeescopeError::ConfigError(format!(
            "Invalid duration '{}'. Use format like 30s, 5m, 1h", s
        ))
    })
}

/// Truncate a string to max chars, adding "..." if truncated
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Amount prefixed with its currency symbol, e.g. "₹40"
pub fn money(symbol: &str, amount: f64) -> String {
    format!("{}{}", symbol, feescope::price::format_amount(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("45"), Some(45));
        assert_eq!(parse_duration("30s"), Some(30));
        assert_eq!(parse_duration("5m"), Some(300));
        assert_eq!(parse_duration("2H"), Some(7200));
        assert_eq!(parse_duration("1d"), None);
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("abc"), None);
    }

    #[test]
    fn test_parse_linger_error() {
        assert!(parse_linger("soon").is_err());
        assert_eq!(parse_linger("2m").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a long page title", 10), "a long ...");
        assert_eq!(truncate_str("₹₹₹₹₹₹", 5), "₹₹...");
    }
}
