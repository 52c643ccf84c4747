//! DexScreener API Client
//!
//! HTTP client for the public DexScreener tokens endpoint.
//! Handles batching limits, request spacing and retry on 429/5xx.

use std::collections::HashSet;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::normalize_address;
use crate::ports::price_source::{check_batch, PriceMap, PriceSource, PriceSourceError, BATCH_MAX};
use super::types::{select_best_prices, TokensResponse};

pub const DEXSCREENER_API: &str = "https://api.dexscreener.com";

/// Upper bound on attempts per batch
pub const MAX_RETRIES: u32 = 10;

/// Longest single pause between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// DexScreener client configuration
#[derive(Debug, Clone)]
pub struct DexScreenerConfig {
    /// Base URL, without trailing slash
    pub api_base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Number of attempts per batch
    pub max_retries: u32,
    /// Minimum gap between two requests from this client
    pub min_request_interval: Duration,
    /// First pause after a 429, doubled per attempt
    pub rate_limit_backoff: Duration,
    /// First pause after a 5xx or transport error, doubled per attempt
    pub retry_backoff: Duration,
}

impl Default for DexScreenerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEXSCREENER_API.to_string(),
            timeout: Duration::from_secs(15),
            max_retries: 3,
            min_request_interval: Duration::from_millis(1000),
            rate_limit_backoff: Duration::from_secs(2),
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Pause before the attempt after `attempt` (zero-based): `base * 2^attempt`,
/// capped at `MAX_BACKOFF`
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(MAX_BACKOFF)
}

/// DexScreener price client
#[derive(Debug)]
pub struct DexScreenerClient {
    config: DexScreenerConfig,
    http: Client,
    /// When the last request left; owned per instance so two clients never
    /// throttle each other
    last_request: Mutex<Option<Instant>>,
}

impl DexScreenerClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self, PriceSourceError> {
        Self::with_config(DexScreenerConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: DexScreenerConfig) -> Result<Self, PriceSourceError> {
        if config.max_retries == 0 || config.max_retries > MAX_RETRIES {
            return Err(PriceSourceError::Config(format!(
                "max_retries must be 1-{}, got {}",
                MAX_RETRIES, config.max_retries
            )));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("dexwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PriceSourceError::Config(e.to_string()))?;

        Ok(Self {
            config: DexScreenerConfig {
                api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
                ..config
            },
            http,
            last_request: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &DexScreenerConfig {
        &self.config
    }

    /// Tokens endpoint URL for a batch of addresses
    pub fn tokens_url(&self, addresses: &[String]) -> String {
        format!("{}/latest/dex/tokens/{}", self.config.api_base_url, addresses.join(","))
    }

    /// Fetch one batch, surfacing every failure
    pub async fn fetch_batch(&self, addresses: &[String]) -> Result<PriceMap, PriceSourceError> {
        check_batch(addresses, BATCH_MAX)?;
        if addresses.is_empty() {
            return Ok(PriceMap::new());
        }

        let normalized: Vec<String> = addresses.iter().map(|a| normalize_address(a)).collect();
        let url = self.tokens_url(&normalized);
        let response = self.execute_with_retry(&url).await?;

        let body: TokensResponse = response
            .json()
            .await
            .map_err(|e| PriceSourceError::Parse(e.to_string()))?;

        let requested: HashSet<String> = normalized.into_iter().collect();
        let mut prices = select_best_prices(&body.pairs.unwrap_or_default());
        prices.retain(|address, _| requested.contains(address));

        tracing::debug!("DexScreener priced {}/{} tokens", prices.len(), addresses.len());
        Ok(prices)
    }

    /// Block until `min_request_interval` has passed since the previous request
    async fn wait_for_slot(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.min_request_interval {
                tokio::time::sleep(self.config.min_request_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Execute a GET with retry logic and rate limit handling
    async fn execute_with_retry(&self, url: &str) -> Result<reqwest::Response, PriceSourceError> {
        let max_retries = self.config.max_retries;
        let mut last_error = None;

        for attempt in 0..max_retries {
            self.wait_for_slot().await;
            let is_last = attempt + 1 == max_retries;

            match self.http.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    // Exponential backoff on 429: 2s, 4s, 8s by default
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let backoff = backoff_delay(self.config.rate_limit_backoff, attempt);
                        tracing::warn!(
                            "Rate limited (429), backing off for {:?} (attempt {}/{})",
                            backoff, attempt + 1, max_retries
                        );
                        last_error = Some(PriceSourceError::RateLimited { attempts: attempt + 1 });
                        if !is_last {
                            tokio::time::sleep(backoff).await;
                        }
                        continue;
                    }

                    if status.is_server_error() {
                        tracing::warn!("DexScreener server error {} (attempt {}/{})", status, attempt + 1, max_retries);
                        last_error = Some(PriceSourceError::Http(format!("Server error: {}", status)));
                        if !is_last {
                            tokio::time::sleep(backoff_delay(self.config.retry_backoff, attempt)).await;
                        }
                        continue;
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    return Err(PriceSourceError::Http(format!("API error {}: {}", status, error_text)));
                }
                Err(e) => {
                    tracing::warn!("DexScreener request failed (attempt {}/{}): {}", attempt + 1, max_retries, e);
                    last_error = Some(PriceSourceError::Http(e.to_string()));
                    if !is_last {
                        tokio::time::sleep(backoff_delay(self.config.retry_backoff, attempt)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PriceSourceError::Http("Max retries exceeded".into())))
    }
}

#[async_trait]
impl PriceSource for DexScreenerClient {
    async fn resolve_prices(&self, addresses: &[String]) -> Result<PriceMap, PriceSourceError> {
        check_batch(addresses, BATCH_MAX)?;

        match self.fetch_batch(addresses).await {
            Ok(prices) => Ok(prices),
            Err(e) => {
                tracing::warn!("Price batch of {} failed, treating as unpriced: {}", addresses.len(), e);
                Ok(PriceMap::new())
            }
        }
    }
}
