//! Token Store Port
//!
//! Durable table of tracked tokens. Every mutation is individually atomic;
//! nothing here spans more than one token.

use chrono::Duration;
use thiserror::Error;

use crate::domain::{NewToken, TrackedToken};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[cfg_attr(test, mockall::automock)]
pub trait TokenStore: Send + Sync {
    /// Insert a token unless its normalized address is already present.
    /// Returns true when a row was written.
    fn upsert_new(&self, token: &NewToken) -> Result<bool, StoreError>;

    /// All tokens with a positive baseline price, with their milestone history
    fn list_trackable(&self) -> Result<Vec<TrackedToken>, StoreError>;

    /// Add `label` to the token's history. Returns false (not an error) when the
    /// label was already recorded or the address is unknown.
    fn record_milestone(&self, address: &str, label: &str) -> Result<bool, StoreError>;

    /// Delete tokens first seen more than `max_age` ago; returns rows removed
    fn expire_older_than(&self, max_age: Duration) -> Result<usize, StoreError>;

    /// Discovery seen-check
    fn is_seen(&self, address: &str) -> Result<bool, StoreError>;

    /// Number of stored tokens, trackable or not
    fn count(&self) -> Result<usize, StoreError>;

    /// Most recently seen tokens, newest first
    fn recent(&self, limit: usize) -> Result<Vec<TrackedToken>, StoreError>;
}
