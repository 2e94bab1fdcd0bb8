//! Test fixtures for pipeline testing.

use std::sync::Arc;

use super::mocks::StubGateway;
use crate::core::{StageKind, StageRecord, UserRequest};
use crate::events::{CollectingEventSink, EventSink};
use crate::gateway::CompletionGateway;
use crate::pipeline::Orchestrator;
use crate::stages::{
    DesignTemplate, IntentTemplate, ReleaseTemplate, RequirementsTemplate, StageInput,
    StageTemplate,
};

/// The canonical coaching request.
#[must_use]
pub fn coaching_request() -> UserRequest {
    UserRequest::new("I want personalized coaching")
}

fn with_template<R>(kind: StageKind, f: impl FnOnce(&dyn StageTemplate) -> R) -> R {
    match kind {
        StageKind::Intent => f(&IntentTemplate),
        StageKind::Requirements => f(&RequirementsTemplate),
        StageKind::Design => f(&DesignTemplate),
        StageKind::Release => f(&ReleaseTemplate),
    }
}

/// A produced record of `kind` carrying `payload`.
#[must_use]
pub fn produced_record(kind: StageKind, payload: &str) -> StageRecord {
    let request = coaching_request();
    let body = with_template(kind, |t| {
        t.success_record(StageInput::Request(&request), payload.to_string())
    });
    StageRecord::produced(body)
}

/// The fallback record of `kind` for a request with `intent`.
#[must_use]
pub fn fallback_record(kind: StageKind, intent: &str) -> StageRecord {
    let request = UserRequest::new(intent);
    let body = with_template(kind, |t| t.fallback_record(StageInput::Request(&request)));
    StageRecord::fallback(body, "stubbed failure")
}

/// An orchestrator over `gateway` with a collecting event sink.
#[must_use]
pub fn stub_orchestrator(
    gateway: StubGateway,
) -> (Orchestrator, Arc<StubGateway>, Arc<CollectingEventSink>) {
    let gateway = Arc::new(gateway);
    let events = Arc::new(CollectingEventSink::new());
    let shared_gateway: Arc<dyn CompletionGateway> = gateway.clone();
    let sink: Arc<dyn EventSink> = events.clone();
    let orchestrator = Orchestrator::builder(shared_gateway)
        .with_event_sink(sink)
        .build();
    (orchestrator, gateway, events)
}
