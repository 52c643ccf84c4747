//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, these traits abstract:
//! - Durable token storage
//! - Batched price lookup
//! - Alert enrichment and delivery

pub mod token_store;
pub mod price_source;
pub mod alerts;
pub mod mocks;

// Re-export main traits and types
pub use token_store::{StoreError, TokenStore};
pub use price_source::{check_batch, PriceMap, PriceSource, PriceSourceError, BATCH_MAX};
pub use alerts::{AlertError, Annotation, MilestoneAlert, MilestoneEnricher, MilestoneNotifier};
