//! Tracking Orchestrator
//!
//! One cycle: sweep expired tokens, load trackable ones, price them in
//! batches, evaluate milestones, persist, emit events.
//! `run()` repeats cycles on an interval-aligned schedule until `stop()`.

use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Notify, RwLock};

use crate::domain::{price_change, MilestoneEvent, MilestoneKind, MilestoneTable, TrackedToken};
use crate::ports::price_source::{PriceSource, BATCH_MAX};
use crate::ports::token_store::{StoreError, TokenStore};
use super::dispatcher::AlertDispatcher;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Cycle timing and sizing
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSettings {
    /// Tokens first seen before `now - retention` are deleted
    pub retention: chrono::Duration,
    /// Addresses per price request
    pub batch_max: usize,
    /// Pause between consecutive price requests
    pub batch_delay: Duration,
    /// Schedule period for `run()`
    pub poll_interval: Duration,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            retention: chrono::Duration::hours(168),
            batch_max: BATCH_MAX,
            batch_delay: Duration::from_millis(1500),
            poll_interval: Duration::from_secs(3600),
        }
    }
}

/// Outcome of one tracking cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub expired: usize,
    pub tracked: usize,
    pub batches: usize,
    pub priced: usize,
    /// Tokens whose milestone writes failed; retried next cycle
    pub persist_failures: usize,
    pub events: Vec<MilestoneEvent>,
}

/// Start of the next `interval`-aligned slot strictly after `now`
pub fn next_tick_after(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let period = interval.as_secs().max(1) as i64;
    let next = (now.timestamp().div_euclid(period) + 1) * period;
    DateTime::<Utc>::from_timestamp(next, 0).unwrap_or(now)
}

/// Milestone tracking loop over a token store and a price source
pub struct TrackingOrchestrator {
    store: Arc<dyn TokenStore>,
    prices: Arc<dyn PriceSource>,
    table: MilestoneTable,
    settings: TrackingSettings,
    dispatcher: Option<Arc<AlertDispatcher>>,
    is_running: Arc<RwLock<bool>>,
    shutdown: Arc<Notify>,
    last_report: Arc<RwLock<Option<CycleReport>>>,
}

impl TrackingOrchestrator {
    pub fn new(
        store: Arc<dyn TokenStore>,
        prices: Arc<dyn PriceSource>,
        table: MilestoneTable,
        settings: TrackingSettings,
    ) -> Result<Self, OrchestratorError> {
        if settings.batch_max == 0 || settings.batch_max > BATCH_MAX {
            return Err(OrchestratorError::Config(format!(
                "batch_max must be 1-{}, got {}",
                BATCH_MAX, settings.batch_max
            )));
        }

        Ok(Self {
            store,
            prices,
            table,
            settings,
            dispatcher: None,
            is_running: Arc::new(RwLock::new(false)),
            shutdown: Arc::new(Notify::new()),
            last_report: Arc::new(RwLock::new(None)),
        })
    }

    /// Hand each successful cycle's events to `dispatcher` inside `run()`
    pub fn with_dispatcher(mut self, dispatcher: Arc<AlertDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Run one full cycle.
    ///
    /// Only a failure to read the trackable set aborts the cycle; price and
    /// write failures are logged and the affected tokens wait for next cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, OrchestratorError> {
        let mut report = CycleReport::default();

        // Sweep before load so expired tokens are never priced
        match self.store.expire_older_than(self.settings.retention) {
            Ok(removed) => {
                report.expired = removed;
                if removed > 0 {
                    tracing::info!("Expired {} tokens older than {}h", removed, self.settings.retention.num_hours());
                }
            }
            Err(e) => tracing::warn!("Retention sweep failed: {}", e),
        }

        let tokens = self.store.list_trackable()?;
        report.tracked = tokens.len();
        if tokens.is_empty() {
            tracing::debug!("No trackable tokens");
            *self.last_report.write().await = Some(report.clone());
            return Ok(report);
        }

        for (index, chunk) in tokens.chunks(self.settings.batch_max).enumerate() {
            if index > 0 && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
            report.batches += 1;

            let addresses: Vec<String> = chunk.iter().map(|t| t.address.clone()).collect();
            let prices = match self.prices.resolve_prices(&addresses).await {
                Ok(prices) => prices,
                Err(e) => {
                    tracing::warn!("Price batch {} failed: {}", index + 1, e);
                    continue;
                }
            };
            tracing::debug!("Batch {}: {}/{} priced", index + 1, prices.len(), chunk.len());

            for token in chunk {
                let Some(&current_price) = prices.get(&token.address) else {
                    continue;
                };
                report.priced += 1;

                match self.process_token(token, current_price) {
                    Ok(Some(event)) => report.events.push(event),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("Failed to record milestone for {}: {}", token.address, e);
                        report.persist_failures += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Cycle done: {} tracked, {} priced, {} milestones, {} expired",
            report.tracked, report.priced, report.events.len(), report.expired
        );

        *self.last_report.write().await = Some(report.clone());
        Ok(report)
    }

    /// Evaluate one priced token and persist any crossing before building the event
    fn process_token(&self, token: &TrackedToken, current_price: f64) -> Result<Option<MilestoneEvent>, StoreError> {
        let evaluation = self.table.evaluate(token.baseline_price, current_price, &token.milestones_hit);

        let (labels, announced, kind, multiplier, percent_change) = match evaluation.highest.clone() {
            Some(highest) => (
                evaluation.new_labels,
                highest,
                MilestoneKind::Gain,
                evaluation.multiplier,
                evaluation.percent_change,
            ),
            None => {
                let Some(label) = self
                    .table
                    .check_drawdown(token.baseline_price, current_price, &token.milestones_hit)
                else {
                    return Ok(None);
                };
                let Some((multiplier, percent_change)) = price_change(token.baseline_price, current_price) else {
                    return Ok(None);
                };
                (vec![label.to_string()], label.to_string(), MilestoneKind::Drawdown, multiplier, percent_change)
            }
        };

        for label in &labels {
            self.store.record_milestone(&token.address, label)?;
        }

        tracing::info!(
            "{} ({}) hit {} at {:.2}x [{}]",
            token.symbol, token.address, announced, multiplier, labels.join(", ")
        );

        Ok(Some(MilestoneEvent::new(
            token,
            current_price,
            &announced,
            kind,
            labels,
            multiplier,
            percent_change,
        )))
    }

    /// Run cycles until `stop()`. The first cycle starts immediately, later
    /// ones on `poll_interval` boundaries.
    pub async fn run(&self) -> Result<(), OrchestratorError> {
        *self.is_running.write().await = true;

        tracing::info!("Starting milestone tracker - Poll interval: {:?}", self.settings.poll_interval);

        while *self.is_running.read().await {
            match self.run_cycle().await {
                Ok(report) => {
                    if let Some(dispatcher) = &self.dispatcher {
                        dispatcher.dispatch(&report.events).await;
                    }
                }
                // Continue running despite errors
                Err(e) => tracing::error!("Tracking cycle failed: {}", e),
            }

            if !*self.is_running.read().await {
                break;
            }

            let now = Utc::now();
            let next = next_tick_after(now, self.settings.poll_interval);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!("Next cycle at {}", next);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.shutdown.notified() => {}
            }
        }

        tracing::info!("Milestone tracker stopped");
        Ok(())
    }

    /// Stop the loop; an in-flight cycle finishes first
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        self.shutdown.notify_one();
        tracing::info!("Stop signal sent to tracker");
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub async fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().await.clone()
    }
}

impl Clone for TrackingOrchestrator {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prices: Arc::clone(&self.prices),
            table: self.table.clone(),
            settings: self.settings.clone(),
            dispatcher: self.dispatcher.clone(),
            is_running: Arc::clone(&self.is_running),
            shutdown: Arc::clone(&self.shutdown),
            last_report: Arc::clone(&self.last_report),
        }
    }
}
