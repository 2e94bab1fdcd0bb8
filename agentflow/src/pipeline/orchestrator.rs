//! Sequences the four stages and aggregates their records.

use super::broadcast::{run_broadcast, BroadcastOutcome, BroadcastTask};
use super::run::{PipelineRun, WorkflowResponse};
use crate::agents::{AgentId, AgentRoster, AgentStatus, HealthReport};
use crate::config::AgentflowConfig;
use crate::core::{ContextMap, StageKind, UserRequest};
use crate::errors::{AgentflowError, UnknownAgentError};
use crate::events::{
    EventSink, NoOpEventSink, BROADCAST_COMPLETED, PIPELINE_COMPLETED, PIPELINE_FAILED,
    PIPELINE_STARTED, STAGE_COMPLETED, STAGE_FALLBACK,
};
use crate::gateway::CompletionGateway;
use crate::observability::{RunSpanAttributes, SpanTimer, StageSpanAttributes};
use crate::stages::{DesignStage, IntentStage, ReleaseStage, RequirementsStage, Stage, StageInput};
use crate::utils::{generate_run_id, iso_timestamp};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};

const DEFAULT_NAME: &str = "agentflow";

/// Runs requests through intent, requirements, design and release.
///
/// Immutable after construction; share it behind an `Arc` across tasks.
/// There is no timeout around stage calls: a gateway that never answers
/// stalls its run.
pub struct Orchestrator {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    gateway: Arc<dyn CompletionGateway>,
    roster: AgentRoster,
    event_sink: Arc<dyn EventSink>,
    created_at: String,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("name", &self.name)
            .field("stages", &self.stages)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator with the standard stages and roster.
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self::builder(gateway).build()
    }

    /// Starts a builder.
    pub fn builder(gateway: Arc<dyn CompletionGateway>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(gateway)
    }

    /// Builds an orchestrator backed by the HTTP gateway, logging its events.
    #[cfg(feature = "http-gateway")]
    pub fn from_config(config: &AgentflowConfig) -> Result<Self, AgentflowError> {
        config.validate()?;
        let gateway = crate::gateway::build_gateway(&config.gateway)?;
        Ok(Self::builder(gateway)
            .with_config(config)
            .with_event_sink(Arc::new(crate::events::LoggingEventSink::new()))
            .build())
    }

    /// Pipeline name used in spans and events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The roles in use.
    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    /// Executes the pipeline for a request.
    ///
    /// Always returns a terminal run: `Completed` with four records, or
    /// `Failed` with the aggregation cause.
    pub async fn run(&self, request: UserRequest) -> PipelineRun {
        let run_id = generate_run_id(request.user_id.as_deref());
        let span = info_span!("pipeline_run", pipeline = %self.name, run_id = %run_id);
        self.execute(PipelineRun::new(run_id, request)).instrument(span).await
    }

    async fn execute(&self, mut run: PipelineRun) -> PipelineRun {
        let timer = SpanTimer::start(self.name.as_str());
        let attrs = RunSpanAttributes::new()
            .with_pipeline_name(self.name.as_str())
            .with_run_id(run.run_id())
            .with_user_id(run.request().user_id.as_deref())
            .with_input_digest(run.input_digest());

        info!(input_digest = %run.input_digest(), "Pipeline started");
        self.event_sink
            .emit(PIPELINE_STARTED, Some(attrs.to_event_data()))
            .await;

        for (expected, stage) in StageKind::ALL.into_iter().zip(&self.stages) {
            let stage_timer = SpanTimer::start(stage.name());
            let record = {
                let input = match run.records().last() {
                    Some(previous) => StageInput::Record(previous),
                    None => StageInput::Request(run.request()),
                };
                stage.execute(input).await
            };

            let stage_attrs = StageSpanAttributes::for_record(run.run_id(), &record)
                .with_duration_ms(stage_timer.finish());
            let event = if record.is_fallback() { STAGE_FALLBACK } else { STAGE_COMPLETED };
            info!(
                stage = %expected,
                origin = %record.origin(),
                confidence = record.confidence(),
                "Stage returned"
            );
            self.event_sink.emit(event, Some(stage_attrs.to_event_data())).await;

            if let Err(err) = run.accept(expected, record) {
                return self.finish_failed(run, attrs, timer, &err.to_string()).await;
            }
        }

        if let Err(err) = run.complete() {
            return self.finish_failed(run, attrs, timer, &err.to_string()).await;
        }

        let attrs = attrs
            .with_status(run.status().to_string())
            .with_records(run.records())
            .with_duration_ms(timer.finish());
        info!(
            fallbacks = run.fallback_count(),
            duration_ms = attrs.duration_ms.unwrap_or_default(),
            "Pipeline completed"
        );
        debug!(attributes = ?attrs.to_attributes(), "Run attributes");
        self.event_sink
            .emit(PIPELINE_COMPLETED, Some(attrs.to_event_data()))
            .await;
        run
    }

    async fn finish_failed(
        &self,
        run: PipelineRun,
        attrs: RunSpanAttributes,
        timer: SpanTimer,
        cause: &str,
    ) -> PipelineRun {
        let attrs = attrs
            .with_status(run.status().to_string())
            .with_records(run.records())
            .with_duration_ms(timer.finish())
            .with_error(cause);
        error!(records = run.records().len(), error = %cause, "Pipeline failed");
        debug!(attributes = ?attrs.to_attributes(), "Run attributes");
        self.event_sink.emit(PIPELINE_FAILED, Some(attrs.to_event_data())).await;
        run
    }

    /// Runs the pipeline and returns the caller-facing response.
    ///
    /// # Errors
    ///
    /// Returns [`AgentflowError::Aggregation`] if the run failed.
    pub async fn run_pipeline(
        &self,
        intent: impl Into<String>,
        context: Option<ContextMap>,
        user_id: Option<String>,
    ) -> Result<WorkflowResponse, AgentflowError> {
        let request = UserRequest {
            intent: intent.into(),
            context,
            user_id,
        };
        self.run(request)
            .await
            .into_response()
            .map_err(AgentflowError::from)
    }

    /// Static liveness of one agent.
    pub fn agent_status(&self, agent_id: &str) -> Result<AgentStatus, UnknownAgentError> {
        let agent: AgentId = agent_id.parse()?;
        Ok(AgentStatus::active(agent, self.created_at.clone()))
    }

    /// Static service health.
    pub fn health(&self) -> HealthReport {
        HealthReport::healthy()
    }

    /// Asks an agent's producer role to improve its output from feedback.
    pub async fn improve_agent(
        &self,
        agent_id: &str,
        feedback: serde_json::Value,
    ) -> Result<BroadcastOutcome, UnknownAgentError> {
        let agent: AgentId = agent_id.parse()?;
        Ok(self.broadcast(BroadcastTask::Improve { agent, feedback }).await)
    }

    /// Runs a task outside the stage sequence.
    pub async fn broadcast(&self, task: BroadcastTask) -> BroadcastOutcome {
        let span = info_span!("broadcast", pipeline = %self.name, task = task.name());
        let outcome = run_broadcast(self.gateway.as_ref(), &self.roster, &task)
            .instrument(span)
            .await;
        self.event_sink
            .emit(
                BROADCAST_COMPLETED,
                Some(serde_json::json!({
                    "task": outcome.task,
                    "success": outcome.success,
                })),
            )
            .await;
        outcome
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    gateway: Arc<dyn CompletionGateway>,
    name: String,
    roster: AgentRoster,
    event_sink: Arc<dyn EventSink>,
    overrides: BTreeMap<StageKind, Arc<dyn Stage>>,
}

impl OrchestratorBuilder {
    /// Creates a builder with the standard roster and no event sink.
    pub fn new(gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            gateway,
            name: DEFAULT_NAME.to_string(),
            roster: AgentRoster::new(),
            event_sink: Arc::new(NoOpEventSink),
            overrides: BTreeMap::new(),
        }
    }

    /// Applies the pipeline name and temperature overrides of a config.
    #[must_use]
    pub fn with_config(mut self, config: &AgentflowConfig) -> Self {
        self.name = config.pipeline.name.clone();
        self.roster = config.roster();
        self
    }

    /// Sets the pipeline name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the roster.
    #[must_use]
    pub fn with_roster(mut self, roster: AgentRoster) -> Self {
        self.roster = roster;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Replaces the stage that fills `slot`. The stage's own kind is not
    /// checked here; aggregation rejects a mismatched record at run time.
    #[must_use]
    pub fn with_stage(mut self, slot: StageKind, stage: Arc<dyn Stage>) -> Self {
        self.overrides.insert(slot, stage);
        self
    }

    /// Builds the orchestrator.
    pub fn build(mut self) -> Orchestrator {
        let mut stages = Vec::with_capacity(StageKind::ALL.len());
        for slot in StageKind::ALL {
            let stage = match self.overrides.remove(&slot) {
                Some(stage) => stage,
                None => self.default_stage(slot),
            };
            stages.push(stage);
        }

        Orchestrator {
            name: self.name,
            stages,
            gateway: self.gateway,
            roster: self.roster,
            event_sink: self.event_sink,
            created_at: iso_timestamp(),
        }
    }

    fn default_stage(&self, slot: StageKind) -> Arc<dyn Stage> {
        let gateway = Arc::clone(&self.gateway);
        match slot {
            StageKind::Intent => Arc::new(IntentStage::from_roster(gateway, &self.roster)),
            StageKind::Requirements => Arc::new(RequirementsStage::from_roster(gateway, &self.roster)),
            StageKind::Design => Arc::new(DesignStage::from_roster(gateway, &self.roster)),
            StageKind::Release => Arc::new(ReleaseStage::from_roster(gateway, &self.roster)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RunStatus;
    use crate::testing::StubGateway;

    #[tokio::test]
    async fn test_agent_status_known_and_unknown() {
        let orchestrator = Orchestrator::new(Arc::new(StubGateway::new()));

        let status = orchestrator.agent_status("technical").unwrap();
        assert_eq!(status.agent_id, "technical");
        assert_eq!(status.status, "active");

        let err = orchestrator.agent_status("nonexistent").unwrap_err();
        assert_eq!(err.agent_id, "nonexistent");
    }

    #[tokio::test]
    async fn test_last_activity_is_construction_time() {
        let orchestrator = Orchestrator::new(Arc::new(StubGateway::new()));
        let before = orchestrator.agent_status("intent").unwrap().last_activity;
        orchestrator.run(UserRequest::new("x")).await;
        let after = orchestrator.agent_status("intent").unwrap().last_activity;
        assert_eq!(before, after);
    }

    #[test]
    fn test_health() {
        let orchestrator = Orchestrator::new(Arc::new(StubGateway::new()));
        assert_eq!(orchestrator.health(), HealthReport::healthy());
    }

    #[tokio::test]
    async fn test_improve_unknown_agent() {
        let orchestrator = Orchestrator::new(Arc::new(StubGateway::new()));
        let err = orchestrator
            .improve_agent("marketing", serde_json::json!({"note": "shorter"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Agent not found: marketing");
    }

    #[tokio::test]
    async fn test_config_name_and_temperatures() {
        let config = AgentflowConfig::from_json_str(
            r#"{"pipeline": {"name": "coaching", "temperatures": {"release": 0.9}}}"#,
        )
        .unwrap();
        let orchestrator = Orchestrator::builder(Arc::new(StubGateway::new()))
            .with_config(&config)
            .build();

        assert_eq!(orchestrator.name(), "coaching");
        assert!((orchestrator.roster().producer(AgentId::Release).temperature - 0.9).abs() < f32::EPSILON);

        let run = orchestrator.run(UserRequest::new("x")).await;
        assert_eq!(run.status(), RunStatus::Completed);
    }

    #[cfg(feature = "http-gateway")]
    #[test]
    fn test_from_config_builds_http_orchestrator() {
        let config = AgentflowConfig::from_json_str(
            r#"{"gateway": {"base_url": "http://localhost:9"}, "pipeline": {"name": "http"}}"#,
        )
        .unwrap();

        let orchestrator = Orchestrator::from_config(&config).unwrap();
        assert_eq!(orchestrator.name(), "http");
        assert_eq!(orchestrator.health().status, "healthy");

        let bad = AgentflowConfig {
            gateway: crate::config::GatewayConfig::new().with_model(" "),
            ..AgentflowConfig::default()
        };
        assert!(Orchestrator::from_config(&bad).is_err());
    }

    #[test]
    fn test_debug_lists_stages() {
        let orchestrator = Orchestrator::new(Arc::new(StubGateway::new()));
        let text = format!("{orchestrator:?}");
        assert!(text.contains("Release Coordinator"));
    }
}
