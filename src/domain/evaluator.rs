//! Milestone Evaluator
//!
//! Pure transition logic: (baseline, current, already hit) -> newly hit labels.
//! No I/O; the orchestrator persists whatever this returns.

use serde::{Deserialize, Serialize};

use super::milestone::{MilestoneSet, MilestoneTable};

/// Result of evaluating one token against the upside ladder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Newly crossed labels in ascending severity
    pub new_labels: Vec<String>,
    /// Most severe newly crossed label (last of `new_labels`)
    pub highest: Option<String>,
    /// current / baseline, 0.0 when evaluation was not possible
    pub multiplier: f64,
    /// (current - baseline) / baseline * 100, 0.0 when not possible
    pub percent_change: f64,
}

impl Evaluation {
    pub fn is_empty(&self) -> bool {
        self.new_labels.is_empty()
    }
}

/// Both prices must be finite and positive for any comparison
fn comparable(baseline_price: f64, current_price: f64) -> bool {
    baseline_price.is_finite() && current_price.is_finite() && baseline_price > 0.0 && current_price > 0.0
}

/// Multiplier and percent change of `current` against `baseline`
pub fn price_change(baseline_price: f64, current_price: f64) -> Option<(f64, f64)> {
    if !comparable(baseline_price, current_price) {
        return None;
    }
    let multiplier = current_price / baseline_price;
    let percent_change = (current_price - baseline_price) / baseline_price * 100.0;
    Some((multiplier, percent_change))
}

impl MilestoneTable {
    /// Evaluate the upside ladder.
    ///
    /// Every threshold at or below the multiplier that is not yet in
    /// `already_hit` is returned, so skipped intermediate labels get recorded
    /// too. Only `highest` is meant to be announced.
    pub fn evaluate(&self, baseline_price: f64, current_price: f64, already_hit: &MilestoneSet) -> Evaluation {
        let Some((multiplier, percent_change)) = price_change(baseline_price, current_price) else {
            return Evaluation::default();
        };

        let new_labels: Vec<String> = self
            .gains()
            .iter()
            .filter(|def| !already_hit.contains(&def.label) && multiplier >= def.multiplier)
            .map(|def| def.label.clone())
            .collect();

        let highest = new_labels.last().cloned();

        Evaluation { new_labels, highest, multiplier, percent_change }
    }

    /// Drawdown label if the price has fallen through the configured drop
    /// and the label has not fired before
    pub fn check_drawdown(&self, baseline_price: f64, current_price: f64, already_hit: &MilestoneSet) -> Option<&str> {
        let rule = self.drawdown()?;
        if !comparable(baseline_price, current_price) || already_hit.contains(&rule.label) {
            return None;
        }

        let change = (current_price - baseline_price) / baseline_price;
        (change <= rule.threshold()).then_some(rule.label.as_str())
    }
}
