//! Milestone Events
//!
//! The outward-facing value produced when a token crosses a milestone.
//! Consumed by enrichment and notification; never persisted directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::token::TrackedToken;

/// Direction of the crossed milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneKind {
    Gain,
    Drawdown,
}

impl fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MilestoneKind::Gain => write!(f, "gain"),
            MilestoneKind::Drawdown => write!(f, "drawdown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneEvent {
    pub address: String,
    pub chain: String,
    pub symbol: String,
    pub name: String,
    pub baseline_price: f64,
    pub current_price: f64,
    /// The single label announced for this crossing
    pub milestone_label: String,
    pub kind: MilestoneKind,
    /// Every label recorded for this token in the same cycle, ascending
    pub newly_hit: Vec<String>,
    pub multiplier: f64,
    pub percent_change: f64,
    pub observed_at: DateTime<Utc>,
}

impl MilestoneEvent {
    pub fn new(
        token: &TrackedToken,
        current_price: f64,
        milestone_label: &str,
        kind: MilestoneKind,
        newly_hit: Vec<String>,
        multiplier: f64,
        percent_change: f64,
    ) -> Self {
        Self {
            address: token.address.clone(),
            chain: token.chain.clone(),
            symbol: token.symbol.clone(),
            name: token.name.clone(),
            baseline_price: token.baseline_price,
            current_price,
            milestone_label: milestone_label.to_string(),
            kind,
            newly_hit,
            multiplier,
            percent_change,
            observed_at: Utc::now(),
        }
    }

    /// Labels recorded this cycle but not announced
    pub fn skipped_labels(&self) -> impl Iterator<Item = &str> {
        self.newly_hit
            .iter()
            .map(String::as_str)
            .filter(move |l| *l != self.milestone_label)
    }

    pub fn dexscreener_url(&self) -> String {
        format!("https://dexscreener.com/{}/{}", self.chain.to_lowercase(), self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::token::NewToken;

    #[test]
    fn test_event_from_token() {
        let token: TrackedToken = NewToken::new("abc", "solana", "WIF", "dogwifhat", 0.1).into();
        let event = MilestoneEvent::new(
            &token,
            0.6,
            "5x",
            MilestoneKind::Gain,
            vec!["+50%".into(), "2x".into(), "5x".into()],
            6.0,
            500.0,
        );

        assert_eq!(event.address, "abc");
        assert_eq!(event.baseline_price, 0.1);
        assert_eq!(event.skipped_labels().collect::<Vec<_>>(), vec!["+50%", "2x"]);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&MilestoneKind::Drawdown).unwrap();
        assert_eq!(json, "\"drawdown\"");
        assert_eq!(MilestoneKind::Gain.to_string(), "gain");
    }
}
