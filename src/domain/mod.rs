//! Domain Layer - Core logic for the milestone tracker
//!
//! Pure types and evaluation with no I/O. All external interactions happen
//! through the ports layer.
//!
//! - `token`: discovered and tracked token records
//! - `milestone`: label sets, the gain ladder and the drawdown rule
//! - `evaluator`: baseline/current price -> newly crossed milestones
//! - `event`: the outward-facing crossing record

pub mod token;
pub mod milestone;
pub mod evaluator;
pub mod event;

pub use token::{normalize_address, NewToken, TrackedToken};
pub use milestone::{
    default_milestones, DrawdownRule, MilestoneDefinition, MilestoneError, MilestoneSet, MilestoneTable,
    LABEL_DELIMITER,
};
pub use evaluator::{price_change, Evaluation};
pub use event::{MilestoneEvent, MilestoneKind};
