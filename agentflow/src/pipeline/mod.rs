//! Pipeline orchestration.
//!
//! The [`Orchestrator`] runs the four stages strictly in order, threads each
//! record into the next stage and assembles the records into a
//! [`PipelineRun`]. Stage failures never reach it; the only run-level error
//! is an [`AggregationError`](crate::errors::AggregationError).

mod broadcast;
mod orchestrator;
mod run;

pub use broadcast::{run_broadcast, BroadcastOutcome, BroadcastTask};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use run::{PerStageResponse, PipelineRun, WorkflowResponse};
