//! Core domain model types for agentflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage kind, record origin and run status enums
//! - The inbound user request
//! - Typed stage records

mod record;
mod request;
mod status;

pub use record::{
    CommunicationPlan, DeploymentStrategy, DesignRecord, IntentRecord, Priority, RecordBody,
    ReleaseRecord, RequirementsRecord, RollbackPolicy, StageRecord,
};
pub use request::{ContextMap, UserRequest};
pub use status::{RecordOrigin, RunStatus, StageKind};
