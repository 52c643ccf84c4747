//! DexScreener wire types
//!
//! Only the fields the tracker reads. `priceUsd` arrives as a decimal string;
//! numbers are accepted too.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

use crate::domain::normalize_address;
use crate::ports::price_source::PriceMap;

/// `GET /latest/dex/tokens/{addresses}` response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TokensResponse {
    #[serde(default)]
    pub pairs: Option<Vec<PairQuote>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PairQuote {
    #[serde(rename = "chainId", default)]
    pub chain_id: Option<String>,
    #[serde(rename = "pairAddress", default)]
    pub pair_address: Option<String>,
    #[serde(rename = "baseToken", default)]
    pub base_token: Option<BaseToken>,
    #[serde(rename = "priceUsd", default)]
    pub price_usd: Option<serde_json::Value>,
    #[serde(default)]
    pub liquidity: Option<Liquidity>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BaseToken {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Liquidity {
    #[serde(default)]
    pub usd: Option<f64>,
}

impl PairQuote {
    /// Lowercase base token address, if present
    pub fn base_address(&self) -> Option<String> {
        self.base_token
            .as_ref()
            .map(|t| normalize_address(&t.address))
            .filter(|a| !a.is_empty())
    }

    /// Pool liquidity in USD; missing counts as zero
    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity
            .as_ref()
            .and_then(|l| l.usd)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    /// USD price; None when missing or unparsable
    pub fn price(&self) -> Option<f64> {
        let price = match self.price_usd.as_ref()? {
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            serde_json::Value::Number(n) => n.as_f64()?,
            _ => return None,
        };
        price.is_finite().then_some(price)
    }
}

/// Pick one price per base token from the pool with the most liquidity.
///
/// Ties keep the pair seen first. If the winning pool has no positive price
/// the token is left out rather than falling back to a thinner pool.
pub fn select_best_prices(pairs: &[PairQuote]) -> PriceMap {
    let mut best: HashMap<String, (f64, Option<f64>)> = HashMap::new();

    for pair in pairs {
        let Some(address) = pair.base_address() else {
            continue;
        };
        let liquidity = pair.liquidity_usd();

        match best.get(&address) {
            Some((best_liquidity, _)) if liquidity <= *best_liquidity => {}
            _ => {
                best.insert(address, (liquidity, pair.price()));
            }
        }
    }

    best.into_iter()
        .filter_map(|(address, (_, price))| price.filter(|p| *p > 0.0).map(|p| (address, p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<PairQuote> {
        serde_json::from_str::<TokensResponse>(json).unwrap().pairs.unwrap_or_default()
    }

    #[test]
    fn test_highest_liquidity_pair_wins() {
        let pairs = parse(
            r#"{"schemaVersion":"1.0.0","pairs":[
                {"chainId":"solana","pairAddress":"p1","baseToken":{"address":"TokenA","symbol":"A","name":"A"},
                 "priceUsd":"0.0100","liquidity":{"usd":10000.0,"base":1,"quote":1}},
                {"chainId":"solana","pairAddress":"p2","baseToken":{"address":"TokenA","symbol":"A","name":"A"},
                 "priceUsd":"0.0125","liquidity":{"usd":90000.0,"base":1,"quote":1}}
            ]}"#,
        );

        let prices = select_best_prices(&pairs);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices.get("tokena"), Some(&0.0125));
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let pairs = parse(
            r#"{"pairs":[
                {"baseToken":{"address":"t"},"priceUsd":"1.0","liquidity":{"usd":500.0}},
                {"baseToken":{"address":"t"},"priceUsd":"2.0","liquidity":{"usd":500.0}}
            ]}"#,
        );
        assert_eq!(select_best_prices(&pairs).get("t"), Some(&1.0));
    }

    #[test]
    fn test_missing_liquidity_counts_as_zero() {
        let pairs = parse(
            r#"{"pairs":[
                {"baseToken":{"address":"t"},"priceUsd":"1.0"},
                {"baseToken":{"address":"t"},"priceUsd":"3.0","liquidity":{"usd":1.0}}
            ]}"#,
        );
        assert_eq!(select_best_prices(&pairs).get("t"), Some(&3.0));
    }

    #[test]
    fn test_unusable_prices_are_omitted() {
        let pairs = parse(
            r#"{"pairs":[
                {"baseToken":{"address":"zero"},"priceUsd":"0","liquidity":{"usd":100.0}},
                {"baseToken":{"address":"junk"},"priceUsd":"n/a","liquidity":{"usd":100.0}},
                {"baseToken":{"address":"missing"},"liquidity":{"usd":100.0}},
                {"baseToken":{"address":""},"priceUsd":"1.0"},
                {"baseToken":{"address":"numeric"},"priceUsd":0.5,"liquidity":{"usd":100.0}}
            ]}"#,
        );

        let prices = select_best_prices(&pairs);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices.get("numeric"), Some(&0.5));
    }

    #[test]
    fn test_thin_pool_not_used_when_deep_pool_has_no_price() {
        let pairs = parse(
            r#"{"pairs":[
                {"baseToken":{"address":"t"},"priceUsd":"1.0","liquidity":{"usd":10.0}},
                {"baseToken":{"address":"t"},"priceUsd":null,"liquidity":{"usd":1000.0}}
            ]}"#,
        );
        assert!(select_best_prices(&pairs).is_empty());
    }

    #[test]
    fn test_null_pairs() {
        let response: TokensResponse = serde_json::from_str(r#"{"schemaVersion":"1.0.0","pairs":null}"#).unwrap();
        assert!(response.pairs.is_none());
    }
}
