//! dexwatch - DEX token milestone tracker
//!
//! Records a baseline price for every discovered token, re-prices the tracked
//! set in rate-limited batches and emits one alert per milestone per token.
//!
//! # Modules
//!
//! - `domain`: Core logic (TrackedToken, MilestoneSet, MilestoneTable, evaluator)
//! - `ports`: Trait abstractions (TokenStore, PriceSource, MilestoneNotifier)
//! - `adapters`: External implementations (SQLite, DexScreener, Telegram, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Tracking orchestrator and alert dispatcher

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
