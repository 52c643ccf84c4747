//! SQLite Adapter
//!
//! Durable `TokenStore` implementation. One table, one row per token address.

mod store;

pub use store::{SqliteTokenStore, DEFAULT_DB_FILE};
