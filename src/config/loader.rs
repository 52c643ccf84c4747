//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/dexwatch.toml.
//! Every section has defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapters::dexscreener::{DexScreenerConfig, DEXSCREENER_API, MAX_RETRIES};
use crate::adapters::sqlite::DEFAULT_DB_FILE;
use crate::application::TrackingSettings;
use crate::domain::{DrawdownRule, MilestoneDefinition, MilestoneError, MilestoneTable};
use crate::ports::price_source::BATCH_MAX;

pub const DEFAULT_CONFIG_PATH: &str = "config/dexwatch.toml";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tracking: TrackingSection,
    /// Upside ladder, ascending by multiplier
    #[serde(default = "default_milestone_entries")]
    pub milestones: Vec<MilestoneEntry>,
    #[serde(default)]
    pub drawdown: DrawdownSection,
    #[serde(default)]
    pub price_source: PriceSourceSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub alerts: AlertsSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracking: TrackingSection::default(),
            milestones: default_milestone_entries(),
            drawdown: DrawdownSection::default(),
            price_source: PriceSourceSection::default(),
            database: DatabaseSection::default(),
            logging: LoggingSection::default(),
            alerts: AlertsSection::default(),
        }
    }
}

/// Longest retention window accepted: 100 years
pub const MAX_RETENTION_HOURS: u64 = 100 * 365 * 24;

/// Tracking cycle section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackingSection {
    /// Tokens first seen longer ago than this are deleted
    pub retention_hours: u64,
    /// Addresses per price request (at most 30)
    pub batch_max: usize,
    /// Pause between price batches
    pub batch_delay_ms: u64,
    /// Scheduled cycle interval
    pub poll_interval_secs: u64,
    /// Pause between consecutive alerts
    pub alert_delay_ms: u64,
}

impl Default for TrackingSection {
    fn default() -> Self {
        Self {
            retention_hours: 168,
            batch_max: BATCH_MAX,
            batch_delay_ms: 1500,
            poll_interval_secs: 3600,
            alert_delay_ms: 1000,
        }
    }
}

/// One `[[milestones]]` entry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MilestoneEntry {
    pub label: String,
    pub multiplier: f64,
}

fn default_milestone_entries() -> Vec<MilestoneEntry> {
    crate::domain::default_milestones()
        .into_iter()
        .map(|m| MilestoneEntry { label: m.label, multiplier: m.multiplier })
        .collect()
}

/// Drawdown alert section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DrawdownSection {
    pub enabled: bool,
    pub label: String,
    /// Percent below baseline, exclusive 0-100
    pub drop_pct: f64,
}

impl Default for DrawdownSection {
    fn default() -> Self {
        let rule = DrawdownRule::default();
        Self { enabled: true, label: rule.label, drop_pct: rule.drop_pct }
    }
}

/// DexScreener section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PriceSourceSection {
    pub api_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Minimum gap between two requests
    pub min_request_interval_ms: u64,
    /// First pause after a 429, doubled per attempt
    pub rate_limit_backoff_ms: u64,
    /// First pause after a 5xx or transport error, doubled per attempt
    pub retry_backoff_ms: u64,
}

impl Default for PriceSourceSection {
    fn default() -> Self {
        Self {
            api_url: DEXSCREENER_API.to_string(),
            timeout_secs: 15,
            max_retries: 3,
            min_request_interval_ms: 1000,
            rate_limit_backoff_ms: 2000,
            retry_backoff_ms: 500,
        }
    }
}

/// SQLite section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Database file; `~` and `$VARS` are expanded
    pub path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self { path: DEFAULT_DB_FILE.to_string() }
    }
}

impl DatabaseSection {
    pub fn resolved_path(&self) -> Result<PathBuf, ConfigError> {
        shellexpand::full(&self.path)
            .map(|p| PathBuf::from(p.as_ref()))
            .map_err(|e| ConfigError::ValidationError(format!("database path: {}", e)))
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// Alerts configuration section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertsSection {
    /// Log alerts to the console
    pub console_enabled: bool,
    /// Enable Telegram notifications
    pub telegram_enabled: bool,
    /// Telegram bot token
    pub telegram_bot_token: String,
    /// Telegram chat ID
    pub telegram_chat_id: String,
}

impl Default for AlertsSection {
    fn default() -> Self {
        Self {
            console_enabled: true,
            telegram_enabled: false,
            telegram_bot_token: String::new(),
            telegram_chat_id: String::new(),
        }
    }
}

impl AlertsSection {
    /// Bot token with TELEGRAM_BOT_TOKEN fallback when the config value is empty
    pub fn get_telegram_bot_token(&self) -> Option<String> {
        non_empty(&self.telegram_bot_token).or_else(|| std::env::var("TELEGRAM_BOT_TOKEN").ok())
    }

    /// Chat ID with TELEGRAM_CHAT_ID fallback when the config value is empty
    pub fn get_telegram_chat_id(&self) -> Option<String> {
        non_empty(&self.telegram_chat_id).or_else(|| std::env::var("TELEGRAM_CHAT_ID").ok())
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid milestone table: {0}")]
    MilestoneError(#[from] MilestoneError),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tracking = &self.tracking;

        if tracking.retention_hours == 0 || tracking.retention_hours > MAX_RETENTION_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "retention_hours must be 1-{}, got {}",
                MAX_RETENTION_HOURS, tracking.retention_hours
            )));
        }

        if tracking.batch_max == 0 || tracking.batch_max > BATCH_MAX {
            return Err(ConfigError::ValidationError(format!(
                "batch_max must be 1-{}, got {}",
                BATCH_MAX, tracking.batch_max
            )));
        }

        if tracking.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }

        // Ladder and drawdown share label validation
        self.milestone_table()?;

        if self.price_source.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api_url cannot be empty".to_string(),
            ));
        }

        if self.price_source.max_retries == 0 || self.price_source.max_retries > MAX_RETRIES {
            return Err(ConfigError::ValidationError(format!(
                "max_retries must be 1-{}, got {}",
                MAX_RETRIES, self.price_source.max_retries
            )));
        }

        if self.price_source.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.database.path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the milestone table from `[[milestones]]` and `[drawdown]`
    pub fn milestone_table(&self) -> Result<MilestoneTable, ConfigError> {
        let gains = self
            .milestones
            .iter()
            .map(|m| MilestoneDefinition::new(&m.label, m.multiplier))
            .collect();
        let table = MilestoneTable::new(gains)?;

        if !self.drawdown.enabled {
            return Ok(table);
        }
        let rule = DrawdownRule::new(&self.drawdown.label, self.drawdown.drop_pct)?;
        Ok(table.with_drawdown(rule)?)
    }

    pub fn tracking_settings(&self) -> TrackingSettings {
        TrackingSettings {
            retention: chrono::Duration::hours(self.tracking.retention_hours.min(MAX_RETENTION_HOURS) as i64),
            batch_max: self.tracking.batch_max,
            batch_delay: Duration::from_millis(self.tracking.batch_delay_ms),
            poll_interval: Duration::from_secs(self.tracking.poll_interval_secs),
        }
    }

    pub fn alert_delay(&self) -> Duration {
        Duration::from_millis(self.tracking.alert_delay_ms)
    }

    pub fn dexscreener_config(&self) -> DexScreenerConfig {
        DexScreenerConfig {
            api_base_url: self.price_source.api_url.clone(),
            timeout: Duration::from_secs(self.price_source.timeout_secs),
            max_retries: self.price_source.max_retries,
            min_request_interval: Duration::from_millis(self.price_source.min_request_interval_ms),
            rate_limit_backoff: Duration::from_millis(self.price_source.rate_limit_backoff_ms),
            retry_backoff: Duration::from_millis(self.price_source.retry_backoff_ms),
        }
    }
}
