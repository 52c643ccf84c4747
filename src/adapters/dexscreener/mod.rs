//! DexScreener Adapter
//!
//! `PriceSource` backed by the DexScreener tokens endpoint:
//! - Up to 30 comma-joined addresses per request
//! - Highest-liquidity pair wins when a token trades in several pools
//! - Per-instance request spacing and bounded retry with backoff

mod client;
mod types;

pub use client::{backoff_delay, DexScreenerClient, DexScreenerConfig, DEXSCREENER_API, MAX_BACKOFF, MAX_RETRIES};
pub use types::{select_best_prices, BaseToken, Liquidity, PairQuote, TokensResponse};
