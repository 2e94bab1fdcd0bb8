//! Event sinks for pipeline observability.
//!
//! The orchestrator emits one event per lifecycle transition. Sinks are
//! injected through the orchestrator builder; the default discards
//! everything.

mod sink;

pub use sink::{
    event_level, CollectedEvent, CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink,
};

/// A run started.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// A stage returned a produced record.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// A stage returned a fallback record.
pub const STAGE_FALLBACK: &str = "stage.fallback";
/// A run completed with four records.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// A run failed aggregation.
pub const PIPELINE_FAILED: &str = "pipeline.failed";
/// A broadcast task finished, successfully or not.
pub const BROADCAST_COMPLETED: &str = "broadcast.completed";
