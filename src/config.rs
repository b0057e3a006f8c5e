use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{FeescopeError, Result};
use crate::rules::ExtractionRules;
use crate::trigger::TriggerConfig;

/// Global feescope configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Currency shown when a page carries no recognisable symbol
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Saved transactions kept in history (oldest are dropped)
    #[serde(default = "default_max_history")]
    pub max_history_items: usize,

    /// Send first-disclosure notifications
    #[serde(default = "default_true")]
    pub enable_notifications: bool,

    /// Default notification target
    #[serde(default)]
    pub default_notify: Option<NotifyTarget>,

    #[serde(default)]
    pub timing: TimingConfig,

    /// Selector and phrase tables per field
    #[serde(default)]
    pub rules: ExtractionRules,
}

/// Monitor timing, all in milliseconds unless stated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_settle")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_poll")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_hard_timeout")]
    pub hard_timeout_ms: u64,
    #[serde(default = "default_debounce")]
    pub reanalysis_debounce_ms: u64,
    #[serde(default = "default_max_passes")]
    pub max_analysis_passes: u32,
    /// How often the page source is re-read to look for mutations
    #[serde(default = "default_mutation_scan")]
    pub mutation_scan_ms: u64,
    /// Seconds to keep watching for mutations after the last pass
    #[serde(default = "default_linger")]
    pub linger_secs: u64,
}

fn default_currency() -> String {
    "₹".to_string()
}

fn default_max_history() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_settle() -> u64 {
    2000
}

fn default_poll() -> u64 {
    1000
}

fn default_hard_timeout() -> u64 {
    10_000
}

fn default_debounce() -> u64 {
    2000
}

fn default_max_passes() -> u32 {
    3
}

fn default_mutation_scan() -> u64 {
    1000
}

fn default_linger() -> u64 {
    30
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle(),
            poll_interval_ms: default_poll(),
            hard_timeout_ms: default_hard_timeout(),
            reanalysis_debounce_ms: default_debounce(),
            max_analysis_passes: default_max_passes(),
            mutation_scan_ms: default_mutation_scan(),
            linger_secs: default_linger(),
        }
    }
}

impl TimingConfig {
    /// Re-arming timers are kept at 1 ms or more so a zero never re-fires at the same instant
    pub fn trigger_config(&self) -> TriggerConfig {
        TriggerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            hard_timeout: Duration::from_millis(self.hard_timeout_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms.max(1)),
            reanalysis_debounce: Duration::from_millis(self.reanalysis_debounce_ms.max(1)),
            max_passes: self.max_analysis_passes,
        }
    }

    pub fn mutation_scan(&self) -> Duration {
        Duration::from_millis(self.mutation_scan_ms.max(1))
    }

    pub fn linger(&self) -> Duration {
        Duration::from_secs(self.linger_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            max_history_items: default_max_history(),
            enable_notifications: true,
            default_notify: None,
            timing: TimingConfig::default(),
            rules: ExtractionRules::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyTarget {
    /// Shell command, receives the result as JSON on stdin
    Command { command: String },
    Ntfy { topic: String, server: Option<String> },
    Slack { webhook_url: String },
    Discord { webhook_url: String },
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| FeescopeError::ConfigError(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "feescope")
            .ok_or_else(|| FeescopeError::ConfigError("Could not determine config directory".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "feescope")
            .ok_or_else(|| FeescopeError::ConfigError("Could not determine data directory".into()))?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the database path
    ///
    /// Supports FEESCOPE_DB environment variable for test isolation
    pub fn db_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("FEESCOPE_DB") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::data_dir()?.join("feescope.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_currency, "₹");
        assert_eq!(config.max_history_items, 50);
        assert!(config.enable_notifications);
        assert_eq!(config.timing.trigger_config(), TriggerConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            default_currency = "$"

            [timing]
            settle_delay_ms = 500
            max_analysis_passes = 1

            [default_notify]
            type = "ntfy"
            topic = "fees"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_currency, "$");
        assert_eq!(config.timing.settle_delay_ms, 500);
        assert_eq!(config.timing.poll_interval_ms, 1000);
        assert_eq!(config.timing.trigger_config().max_passes, 1);
        assert_eq!(
            config.default_notify,
            Some(NotifyTarget::Ntfy {
                topic: "fees".into(),
                server: None
            })
        );
        assert_eq!(config.rules, ExtractionRules::default());
    }

    #[test]
    fn test_zero_intervals_are_clamped() {
        let timing = TimingConfig {
            poll_interval_ms: 0,
            settle_delay_ms: 0,
            reanalysis_debounce_ms: 0,
            mutation_scan_ms: 0,
            hard_timeout_ms: 0,
            ..TimingConfig::default()
        };
        let trigger = timing.trigger_config();
        assert_eq!(trigger.poll_interval, Duration::from_millis(1));
        assert_eq!(trigger.settle_delay, Duration::from_millis(1));
        assert_eq!(trigger.reanalysis_debounce, Duration::from_millis(1));
        assert_eq!(trigger.hard_timeout, Duration::ZERO);
        assert_eq!(timing.mutation_scan(), Duration::from_millis(1));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut config = Config::default();
        config.default_notify = Some(NotifyTarget::Slack {
            webhook_url: "https://hooks.slack.com/services/x".into(),
        });
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
