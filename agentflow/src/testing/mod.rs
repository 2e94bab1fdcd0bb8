//! Test doubles, fixtures and assertions for agentflow pipelines.
//!
//! This module provides:
//! - A scriptable completion gateway
//! - Fixed-output stages
//! - Record and run assertions

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_completed, assert_failed, assert_fallback, assert_produced, assert_stage_order,
};
pub use fixtures::{coaching_request, fallback_record, produced_record, stub_orchestrator};
pub use mocks::{FixedStage, GatewayCall, StubGateway};
