//! Tracked Token
//!
//! The per-token record the store persists and the orchestrator snapshots
//! once per cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::milestone::MilestoneSet;

/// Normalize a token address to the store's key form
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// A token as produced by the discovery layer, before it is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewToken {
    /// Token contract address (normalized on insert)
    pub address: String,
    /// Chain identifier (e.g. "solana", "base")
    pub chain: String,
    pub symbol: String,
    pub name: String,
    /// Liquidity in USD at discovery
    pub liquidity_usd: f64,
    /// Market cap in USD at discovery
    pub market_cap: f64,
    /// USD price at discovery; 0 means "discovered but not price-tracked"
    pub baseline_price: f64,
    /// Discovery time, used as `first_seen_at`
    pub discovered_at: DateTime<Utc>,
}

impl NewToken {
    pub fn new(address: &str, chain: &str, symbol: &str, name: &str, baseline_price: f64) -> Self {
        Self {
            address: normalize_address(address),
            chain: chain.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            liquidity_usd: 0.0,
            market_cap: 0.0,
            baseline_price,
            discovered_at: Utc::now(),
        }
    }

    /// Set discovery-time market stats
    pub fn with_market(mut self, liquidity_usd: f64, market_cap: f64) -> Self {
        self.liquidity_usd = liquidity_usd;
        self.market_cap = market_cap;
        self
    }

    /// Override the discovery timestamp
    pub fn with_discovered_at(mut self, discovered_at: DateTime<Utc>) -> Self {
        self.discovered_at = discovered_at;
        self
    }
}

/// A token held in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedToken {
    /// Lowercase token address (unique key)
    pub address: String,
    pub chain: String,
    pub symbol: String,
    pub name: String,
    pub liquidity_usd: f64,
    pub market_cap: f64,
    /// Baseline USD price; <= 0 means not price-tracked
    pub baseline_price: f64,
    /// Labels already fired for this token
    pub milestones_hit: MilestoneSet,
    pub first_seen_at: DateTime<Utc>,
    pub last_alerted_at: Option<DateTime<Utc>>,
}

impl TrackedToken {
    /// Whether the token is eligible for milestone evaluation
    pub fn is_trackable(&self) -> bool {
        self.baseline_price > 0.0
    }

    /// Hours since the token was first seen
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.first_seen_at).num_seconds().max(0) as f64 / 3600.0
    }

    /// DexScreener page for this token
    pub fn dexscreener_url(&self) -> String {
        format!("https://dexscreener.com/{}/{}", self.chain.to_lowercase(), self.address)
    }
}

impl From<NewToken> for TrackedToken {
    fn from(token: NewToken) -> Self {
        Self {
            address: normalize_address(&token.address),
            chain: token.chain,
            symbol: token.symbol,
            name: token.name,
            liquidity_usd: token.liquidity_usd,
            market_cap: token.market_cap,
            baseline_price: token.baseline_price,
            milestones_hit: MilestoneSet::new(),
            first_seen_at: token.discovered_at,
            last_alerted_at: None,
        }
    }
}
