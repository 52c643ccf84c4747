//! Milestone Definitions
//!
//! The ordered threshold table and the per-token set of labels already fired.
//!
//! Labels are persisted as comma-delimited text; `MilestoneSet` is the
//! in-memory form and owns the parse/serialize pair for that text.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Delimiter used when a set is stored as text
pub const LABEL_DELIMITER: char = ',';

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MilestoneError {
    #[error("Milestone table is empty")]
    EmptyTable,

    #[error("Invalid milestone label: {0:?}")]
    InvalidLabel(String),

    #[error("Duplicate milestone label: {0}")]
    DuplicateLabel(String),

    #[error("Multiplier for {label} must be > 0, got {multiplier}")]
    InvalidMultiplier { label: String, multiplier: f64 },

    #[error("Multipliers must be strictly increasing: {label} ({multiplier}) does not exceed {previous}")]
    NotIncreasing { label: String, multiplier: f64, previous: f64 },

    #[error("Drawdown percentage must be in (0, 100), got {0}")]
    InvalidDrawdown(f64),
}

/// Insertion-ordered set of milestone labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct MilestoneSet {
    labels: Vec<String>,
}

impl MilestoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label; returns false if it was already present
    pub fn insert(&mut self, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() || self.contains(label) {
            return false;
        }
        self.labels.push(label.to_string());
        true
    }

    /// Exact label match (a "2x" entry does not match "12x")
    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Every label in `self` is also in `other`
    pub fn is_subset_of(&self, other: &MilestoneSet) -> bool {
        self.iter().all(|l| other.contains(l))
    }
}

impl fmt::Display for MilestoneSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for label in &self.labels {
            if !first {
                write!(f, "{}", LABEL_DELIMITER)?;
            }
            write!(f, "{}", label)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for MilestoneSet {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = MilestoneSet::new();
        for label in s.split(LABEL_DELIMITER) {
            set.insert(label);
        }
        Ok(set)
    }
}

impl From<Vec<String>> for MilestoneSet {
    fn from(labels: Vec<String>) -> Self {
        let mut set = MilestoneSet::new();
        for label in &labels {
            set.insert(label);
        }
        set
    }
}

impl From<MilestoneSet> for Vec<String> {
    fn from(set: MilestoneSet) -> Self {
        set.labels
    }
}

impl<'a> FromIterator<&'a str> for MilestoneSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = MilestoneSet::new();
        for label in iter {
            set.insert(label);
        }
        set
    }
}

/// A named upside threshold, e.g. "2x" at 2.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneDefinition {
    pub label: String,
    pub multiplier: f64,
}

impl MilestoneDefinition {
    pub fn new(label: &str, multiplier: f64) -> Self {
        Self { label: label.to_string(), multiplier }
    }
}

/// Default upside ladder, ascending severity
pub fn default_milestones() -> Vec<MilestoneDefinition> {
    vec![
        MilestoneDefinition::new("+50%", 1.5),
        MilestoneDefinition::new("2x", 2.0),
        MilestoneDefinition::new("5x", 5.0),
        MilestoneDefinition::new("10x", 10.0),
    ]
}

/// Single downside milestone, fired when price falls `drop_pct` below baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownRule {
    pub label: String,
    /// Percentage drop from baseline, in (0, 100)
    pub drop_pct: f64,
}

impl DrawdownRule {
    pub fn new(label: &str, drop_pct: f64) -> Result<Self, MilestoneError> {
        validate_label(label)?;
        if !(drop_pct > 0.0 && drop_pct < 100.0) {
            return Err(MilestoneError::InvalidDrawdown(drop_pct));
        }
        Ok(Self { label: label.to_string(), drop_pct })
    }

    /// Fractional change at or below which the rule fires (e.g. -0.5)
    pub fn threshold(&self) -> f64 {
        -self.drop_pct / 100.0
    }
}

impl Default for DrawdownRule {
    fn default() -> Self {
        Self { label: "-50%".to_string(), drop_pct: 50.0 }
    }
}

/// Ordered milestone ladder plus the optional drawdown rule
#[derive(Debug, Clone, PartialEq)]
pub struct MilestoneTable {
    gains: Vec<MilestoneDefinition>,
    drawdown: Option<DrawdownRule>,
}

impl MilestoneTable {
    /// Build a ladder; multipliers must be positive and strictly increasing
    pub fn new(gains: Vec<MilestoneDefinition>) -> Result<Self, MilestoneError> {
        if gains.is_empty() {
            return Err(MilestoneError::EmptyTable);
        }

        let mut previous: Option<f64> = None;
        for (i, def) in gains.iter().enumerate() {
            validate_label(&def.label)?;
            if gains[..i].iter().any(|d| d.label == def.label) {
                return Err(MilestoneError::DuplicateLabel(def.label.clone()));
            }
            if !(def.multiplier.is_finite() && def.multiplier > 0.0) {
                return Err(MilestoneError::InvalidMultiplier {
                    label: def.label.clone(),
                    multiplier: def.multiplier,
                });
            }
            if let Some(prev) = previous {
                if def.multiplier <= prev {
                    return Err(MilestoneError::NotIncreasing {
                        label: def.label.clone(),
                        multiplier: def.multiplier,
                        previous: prev,
                    });
                }
            }
            previous = Some(def.multiplier);
        }

        Ok(Self { gains, drawdown: None })
    }

    /// Attach a drawdown rule; its label must not collide with the ladder
    pub fn with_drawdown(mut self, rule: DrawdownRule) -> Result<Self, MilestoneError> {
        if self.gains.iter().any(|d| d.label == rule.label) {
            return Err(MilestoneError::DuplicateLabel(rule.label));
        }
        self.drawdown = Some(rule);
        Ok(self)
    }

    pub fn gains(&self) -> &[MilestoneDefinition] {
        &self.gains
    }

    pub fn drawdown(&self) -> Option<&DrawdownRule> {
        self.drawdown.as_ref()
    }

    /// Every label this table can ever record
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.gains
            .iter()
            .map(|d| d.label.as_str())
            .chain(self.drawdown.iter().map(|r| r.label.as_str()))
    }

}

impl Default for MilestoneTable {
    fn default() -> Self {
        Self {
            gains: default_milestones(),
            drawdown: Some(DrawdownRule::default()),
        }
    }
}

fn validate_label(label: &str) -> Result<(), MilestoneError> {
    if label.trim().is_empty() || label.trim() != label || label.contains(LABEL_DELIMITER) {
        return Err(MilestoneError::InvalidLabel(label.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_insert_is_idempotent() {
        let mut set = MilestoneSet::new();
        assert!(set.insert("2x"));
        assert!(!set.insert("2x"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_set_exact_match() {
        let set: MilestoneSet = "12x".parse().unwrap();
        assert!(set.contains("12x"));
        assert!(!set.contains("2x"));
    }

    #[test]
    fn test_set_text_round_trip() {
        let set: MilestoneSet = ["+50%", "2x", "-50%"].into_iter().collect();
        let text = set.to_string();
        assert_eq!(text, "+50%,2x,-50%");
        assert_eq!(text.parse::<MilestoneSet>().unwrap(), set);
    }

    #[test]
    fn test_set_parse_tolerates_legacy_text() {
        let set: MilestoneSet = ",2x, 5x,,2x".parse().unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["2x", "5x"]);

        let empty: MilestoneSet = "".parse().unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.to_string(), "");
    }

    #[test]
    fn test_set_json_form() {
        let set: MilestoneSet = ["2x", "5x"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["2x","5x"]"#);

        let back: MilestoneSet = serde_json::from_str(r#"["2x","2x","5x"]"#).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_default_table() {
        let table = MilestoneTable::default();
        let labels: Vec<&str> = table.labels().collect();
        assert_eq!(labels, vec!["+50%", "2x", "5x", "10x", "-50%"]);
        assert_eq!(table.drawdown().unwrap().threshold(), -0.5);
    }

    #[test]
    fn test_table_rejects_non_increasing() {
        let result = MilestoneTable::new(vec![
            MilestoneDefinition::new("2x", 2.0),
            MilestoneDefinition::new("also-2x", 2.0),
        ]);
        assert!(matches!(result, Err(MilestoneError::NotIncreasing { .. })));
    }

    #[test]
    fn test_table_rejects_bad_entries() {
        assert_eq!(MilestoneTable::new(vec![]), Err(MilestoneError::EmptyTable));

        let dup = MilestoneTable::new(vec![
            MilestoneDefinition::new("2x", 2.0),
            MilestoneDefinition::new("2x", 3.0),
        ]);
        assert!(matches!(dup, Err(MilestoneError::DuplicateLabel(_))));

        let zero = MilestoneTable::new(vec![MilestoneDefinition::new("zero", 0.0)]);
        assert!(matches!(zero, Err(MilestoneError::InvalidMultiplier { .. })));

        let comma = MilestoneTable::new(vec![MilestoneDefinition::new("2x,5x", 2.0)]);
        assert!(matches!(comma, Err(MilestoneError::InvalidLabel(_))));
    }

    #[test]
    fn test_drawdown_validation() {
        assert!(DrawdownRule::new("-50%", 50.0).is_ok());
        assert!(DrawdownRule::new("-100%", 100.0).is_err());
        assert!(DrawdownRule::new("-0%", 0.0).is_err());

        let table = MilestoneTable::new(default_milestones()).unwrap();
        let clash = table.with_drawdown(DrawdownRule::new("2x", 30.0).unwrap());
        assert!(matches!(clash, Err(MilestoneError::DuplicateLabel(_))));
    }
}
