use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeescopeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] refinery::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Invalid selector '{selector}': {reason}")]
    SelectorError { selector: String, reason: String },

    #[error("Page source error: {0}")]
    SourceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Notification failed: {0}")]
    NotificationError(String),

    #[error("Result sink failed: {0}")]
    SinkError(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
}

impl FeescopeError {
    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            FeescopeError::HttpError(_) => Some(
                "Check your internet connection, or save the checkout page and run:\n  feescope analyze ./checkout.html --site <host>"
            ),
            FeescopeError::SourceError(_) => Some(
                "Pass an http(s) URL, a path to a saved HTML file, or '-' to read stdin"
            ),
            FeescopeError::SelectorError { .. } => Some(
                "Check the [rules] section of your config file:\n  feescope notify show  (prints the config path)"
            ),
            FeescopeError::TransactionNotFound(_) => Some(
                "Run `feescope history` to see recorded transactions"
            ),
            FeescopeError::NotificationError(_) => Some(
                "Check your notification settings with `feescope notify show`\nOr reconfigure with `feescope notify set`"
            ),
            FeescopeError::DatabaseError(_) | FeescopeError::MigrationError(_) => Some(
                "Point FEESCOPE_DB at a writable location, or remove the database to start fresh"
            ),
            FeescopeError::TomlError(_) | FeescopeError::ConfigError(_) => Some(
                "Fix or remove the config file; defaults are used when it is missing"
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FeescopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_present_for_user_facing_errors() {
        let err = FeescopeError::TransactionNotFound("abc".into());
        assert!(err.hint().unwrap().contains("feescope history"));

        let err = FeescopeError::SelectorError {
            selector: "[".into(),
            reason: "unexpected end".into(),
        };
        assert!(err.to_string().contains("Invalid selector '['"));
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_hint_absent_for_internal_errors() {
        let err = FeescopeError::SinkError("closed".into());
        assert!(err.hint().is_none());
    }
}
