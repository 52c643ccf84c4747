//! Alert Ports
//!
//! Downstream collaborators for milestone events: enrichers attach extra
//! context (narrative, wallet analysis), notifiers deliver the alert.
//! Both are fallible per event and never affect persisted milestone state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::MilestoneEvent;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Enrichment failed: {0}")]
    Enrichment(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Notifier disabled: {0}")]
    Disabled(String),
}

/// One key/value contributed by an enricher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Name of the enricher that produced it
    pub source: String,
    pub key: String,
    pub value: String,
}

/// A milestone event plus whatever enrichment succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneAlert {
    pub event: MilestoneEvent,
    pub annotations: Vec<Annotation>,
}

impl MilestoneAlert {
    pub fn new(event: MilestoneEvent) -> Self {
        Self { event, annotations: Vec::new() }
    }

    /// First annotation value for `key`, if any enricher provided one
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.iter().find(|a| a.key == key).map(|a| a.value.as_str())
    }
}

#[async_trait]
pub trait MilestoneEnricher: Send + Sync {
    fn name(&self) -> &str;

    /// Produce key/value context for an event
    async fn enrich(&self, event: &MilestoneEvent) -> Result<Vec<(String, String)>, AlertError>;
}

#[async_trait]
pub trait MilestoneNotifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, alert: &MilestoneAlert) -> Result<(), AlertError>;
}
