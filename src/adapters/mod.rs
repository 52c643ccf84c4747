//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - SQLite: durable token store
//! - DexScreener: batched price source
//! - Notify: Telegram and console notifiers
//! - CLI: Command-line interface

pub mod sqlite;
pub mod dexscreener;
pub mod notify;
pub mod cli;

#[cfg(test)]
pub(crate) mod test_http;

pub use sqlite::SqliteTokenStore;
pub use dexscreener::{DexScreenerClient, DexScreenerConfig};
pub use notify::{ConsoleNotifier, TelegramNotifier};
pub use cli::Cli;
