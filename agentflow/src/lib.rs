//! # Agentflow
//!
//! A four-stage agent pipeline that turns a free-text user request into a
//! delivery plan.
//!
//! Every request flows through the same fixed sequence:
//!
//! - **Intent analysis**: classify the request and identify needs
//! - **Requirements**: derive objectives, acceptance criteria and risks
//! - **Technical design**: choose an architecture and deployment shape
//! - **Release**: plan testing, monitoring, rollback and communication
//!
//! Each stage asks a producer role for a draft and a validator role for a
//! review through a [`gateway::CompletionGateway`]. When either call fails the
//! stage substitutes a lower-confidence fallback record, so a run always
//! reaches the release stage.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agentflow::prelude::*;
//!
//! let config = AgentflowConfig::from_env()?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//!
//! let response = orchestrator
//!     .run_pipeline("I want personalized coaching", None, None)
//!     .await?;
//! println!("{}", response.final_output);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod agents;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agents::{AgentId, AgentRole, AgentRoster, AgentStatus, HealthReport};
    pub use crate::config::{AgentflowConfig, GatewayConfig, LoggingConfig, PipelineConfig};
    pub use crate::core::{
        ContextMap, RecordBody, RecordOrigin, RunStatus, StageKind, StageRecord, UserRequest,
    };
    pub use crate::errors::{AgentflowError, AggregationError, GatewayError, UnknownAgentError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::gateway::CompletionGateway;
    pub use crate::observability::init_logging;
    pub use crate::pipeline::{
        BroadcastOutcome, BroadcastTask, Orchestrator, OrchestratorBuilder, PipelineRun,
        WorkflowResponse,
    };
    pub use crate::stages::{Stage, StageInput};
    pub use crate::utils::{iso_timestamp, Timestamp};
}
