//! In-memory port doubles
//!
//! Deterministic stand-ins for the store, price source and alert ports,
//! used by integration tests and dry runs. No I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::domain::{normalize_address, MilestoneEvent, NewToken, TrackedToken};
use super::alerts::{AlertError, MilestoneAlert, MilestoneEnricher, MilestoneNotifier};
use super::price_source::{check_batch, PriceMap, PriceSource, PriceSourceError, BATCH_MAX};
use super::token_store::{StoreError, TokenStore};

/// Token store backed by a Vec, with switchable failure modes
#[derive(Debug, Default, Clone)]
pub struct InMemoryTokenStore {
    tokens: Arc<Mutex<Vec<TrackedToken>>>,
    fail_reads: Arc<Mutex<bool>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to seed a token
    pub fn with_token(self, token: NewToken) -> Self {
        let _ = self.upsert_new(&token);
        self
    }

    /// Make `list_trackable`/`recent` fail as if the database were gone
    pub fn set_fail_reads(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_reads.lock() {
            *flag = fail;
        }
    }

    /// Make every mutation fail
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    /// Current snapshot of one token
    pub fn get(&self, address: &str) -> Option<TrackedToken> {
        let address = normalize_address(address);
        self.tokens.lock().ok()?.iter().find(|t| t.address == address).cloned()
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if *self.fail_reads.lock().map_err(|_| StoreError::Poisoned)? {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if *self.fail_writes.lock().map_err(|_| StoreError::Poisoned)? {
            return Err(StoreError::Database("writes disabled".into()));
        }
        Ok(())
    }
}

impl TokenStore for InMemoryTokenStore {
    fn upsert_new(&self, token: &NewToken) -> Result<bool, StoreError> {
        self.check_writes()?;
        let mut tokens = self.tokens.lock().map_err(|_| StoreError::Poisoned)?;
        let address = normalize_address(&token.address);
        if tokens.iter().any(|t| t.address == address) {
            return Ok(false);
        }
        tokens.push(TrackedToken::from(token.clone()));
        Ok(true)
    }

    fn list_trackable(&self) -> Result<Vec<TrackedToken>, StoreError> {
        self.check_reads()?;
        let tokens = self.tokens.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(tokens.iter().filter(|t| t.is_trackable()).cloned().collect())
    }

    fn record_milestone(&self, address: &str, label: &str) -> Result<bool, StoreError> {
        self.check_writes()?;
        let mut tokens = self.tokens.lock().map_err(|_| StoreError::Poisoned)?;
        let address = normalize_address(address);
        match tokens.iter_mut().find(|t| t.address == address) {
            Some(token) => {
                let added = token.milestones_hit.insert(label);
                if added {
                    token.last_alerted_at = Some(Utc::now());
                }
                Ok(added)
            }
            None => Ok(false),
        }
    }

    fn expire_older_than(&self, max_age: Duration) -> Result<usize, StoreError> {
        self.check_writes()?;
        let mut tokens = self.tokens.lock().map_err(|_| StoreError::Poisoned)?;
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return Ok(0);
        };
        let before = tokens.len();
        tokens.retain(|t| t.first_seen_at >= cutoff);
        Ok(before - tokens.len())
    }

    fn is_seen(&self, address: &str) -> Result<bool, StoreError> {
        self.check_reads()?;
        Ok(self.get(address).is_some())
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.check_reads()?;
        Ok(self.tokens.lock().map_err(|_| StoreError::Poisoned)?.len())
    }

    fn recent(&self, limit: usize) -> Result<Vec<TrackedToken>, StoreError> {
        self.check_reads()?;
        let mut tokens = self.tokens.lock().map_err(|_| StoreError::Poisoned)?.clone();
        tokens.sort_by(|a, b| b.first_seen_at.cmp(&a.first_seen_at));
        tokens.truncate(limit);
        Ok(tokens)
    }
}

/// Price source answering from a fixed table, recording every batch it sees
#[derive(Debug, Default, Clone)]
pub struct StaticPriceSource {
    prices: Arc<Mutex<HashMap<String, f64>>>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    failing_calls: Arc<Mutex<Vec<usize>>>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set a price for an address
    pub fn with_price(self, address: &str, price: f64) -> Self {
        self.set_price(address, price);
        self
    }

    /// Builder method: the n-th call (0-based) comes back empty
    pub fn failing_call(self, index: usize) -> Self {
        if let Ok(mut failing) = self.failing_calls.lock() {
            failing.push(index);
        }
        self
    }

    pub fn set_price(&self, address: &str, price: f64) {
        if let Ok(mut prices) = self.prices.lock() {
            prices.insert(normalize_address(address), price);
        }
    }

    /// Get all recorded batches
    pub fn get_calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn resolve_prices(&self, addresses: &[String]) -> Result<PriceMap, PriceSourceError> {
        check_batch(addresses, BATCH_MAX)?;

        let call_index = {
            let mut calls = self.calls.lock().map_err(|_| PriceSourceError::Http("poisoned".into()))?;
            calls.push(addresses.to_vec());
            calls.len() - 1
        };

        let failing = self.failing_calls.lock().map(|f| f.contains(&call_index)).unwrap_or(false);
        if failing {
            return Ok(PriceMap::new());
        }

        let prices = self.prices.lock().map_err(|_| PriceSourceError::Http("poisoned".into()))?;
        Ok(addresses
            .iter()
            .map(|a| normalize_address(a))
            .filter_map(|a| prices.get(&a).filter(|p| **p > 0.0).map(|p| (a, *p)))
            .collect())
    }
}

/// Notifier that keeps every alert it was handed
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    alerts: Arc<Mutex<Vec<MilestoneAlert>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that records nothing and errors on every alert
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn get_alerts(&self) -> Vec<MilestoneAlert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MilestoneNotifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, alert: &MilestoneAlert) -> Result<(), AlertError> {
        if self.fail {
            return Err(AlertError::Delivery("recording notifier set to fail".into()));
        }
        self.alerts
            .lock()
            .map_err(|_| AlertError::Delivery("poisoned".into()))?
            .push(alert.clone());
        Ok(())
    }
}

/// Enricher that attaches the same key/value to every event
#[derive(Debug, Clone)]
pub struct StaticEnricher {
    name: String,
    key: String,
    value: String,
    fail: bool,
}

impl StaticEnricher {
    pub fn new(name: &str, key: &str, value: &str) -> Self {
        Self { name: name.into(), key: key.into(), value: value.into(), fail: false }
    }

    pub fn failing(name: &str) -> Self {
        Self { name: name.into(), key: String::new(), value: String::new(), fail: true }
    }
}

#[async_trait]
impl MilestoneEnricher for StaticEnricher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enrich(&self, _event: &MilestoneEvent) -> Result<Vec<(String, String)>, AlertError> {
        if self.fail {
            return Err(AlertError::Enrichment(format!("{} unavailable", self.name)));
        }
        Ok(vec![(self.key.clone(), self.value.clone())])
    }
}
