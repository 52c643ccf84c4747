pub mod dispatcher;
pub mod orchestrator;

pub use dispatcher::{AlertDispatcher, DispatchSummary};
pub use orchestrator::{next_tick_after, CycleReport, OrchestratorError, TrackingOrchestrator, TrackingSettings};
