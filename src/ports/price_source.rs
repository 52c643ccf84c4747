//! Price Source Port
//!
//! Batched USD price lookup by token address.

use std::collections::HashMap;
use async_trait::async_trait;
use thiserror::Error;

/// Hard ceiling on addresses per call (DexScreener tokens endpoint limit)
pub const BATCH_MAX: usize = 30;

#[derive(Error, Debug)]
pub enum PriceSourceError {
    #[error("Batch of {requested} addresses exceeds the limit of {max}")]
    BatchTooLarge { requested: usize, max: usize },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Lowercase address -> positive USD price. Addresses without a usable
/// quote are simply absent.
pub type PriceMap = HashMap<String, f64>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Resolve prices for at most `BATCH_MAX` addresses.
    ///
    /// Oversized requests are rejected with `BatchTooLarge`, never truncated.
    /// Upstream failures are absorbed into an empty or partial map.
    async fn resolve_prices(&self, addresses: &[String]) -> Result<PriceMap, PriceSourceError>;
}

/// Reject a request that would exceed `max`
pub fn check_batch(addresses: &[String], max: usize) -> Result<(), PriceSourceError> {
    if addresses.len() > max {
        return Err(PriceSourceError::BatchTooLarge { requested: addresses.len(), max });
    }
    Ok(())
}
