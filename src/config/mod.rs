//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, AlertsSection, Config, ConfigError, DatabaseSection, DrawdownSection,
    LoggingSection, MilestoneEntry, PriceSourceSection, TrackingSection, DEFAULT_CONFIG_PATH,
};
