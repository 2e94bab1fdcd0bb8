//! The producer + validator stage shared by all four pipeline stages.

use super::{Stage, StageInput};
use crate::agents::{AgentId, AgentRoster, RolePair};
use crate::core::{RecordBody, StageKind, StageRecord};
use crate::errors::GatewayError;
use crate::gateway::{require_text, CompletionGateway};
use async_trait::async_trait;
use std::fmt::{self, Debug, Write as _};
use std::sync::Arc;
use tracing::{debug, warn};

/// The fixed, stage-specific part of an [`AgentStage`]: task wording,
/// review checklist and the success and fallback records.
pub trait StageTemplate: Send + Sync + Debug {
    /// The stage this template fills.
    fn kind(&self) -> StageKind;

    /// Task handed to the producer role.
    fn producer_task(&self, input: StageInput<'_>) -> String;

    /// Points the validator must check.
    fn checklist(&self) -> &'static [&'static str];

    /// Task handed to the validator role, embedding the producer's draft.
    fn validator_task(&self, draft: &str) -> String {
        let mut task = String::from(
            "Review the draft below and improve it where needed. Make sure that:\n",
        );
        for item in self.checklist() {
            let _ = writeln!(task, "- {item}");
        }
        let _ = write!(task, "\nReturn the reviewed version.\n\nDraft:\n{draft}");
        task
    }

    /// Record built when both calls succeed. `reviewed` is the validator's
    /// final text.
    fn success_record(&self, input: StageInput<'_>, reviewed: String) -> RecordBody;

    /// Record substituted when any call fails.
    fn fallback_record(&self, input: StageInput<'_>) -> RecordBody;
}

/// A stage backed by a producer role and a validator role.
pub struct AgentStage<T> {
    template: T,
    roles: RolePair,
    gateway: Arc<dyn CompletionGateway>,
}

impl<T: StageTemplate> AgentStage<T> {
    /// Creates a stage from a template, its roles and a gateway.
    pub fn new(template: T, roles: RolePair, gateway: Arc<dyn CompletionGateway>) -> Self {
        Self {
            template,
            roles,
            gateway,
        }
    }

    /// Creates a stage using the roster's roles for the template's agent.
    pub fn from_roster(gateway: Arc<dyn CompletionGateway>, roster: &AgentRoster) -> Self
    where
        T: Default,
    {
        let template = T::default();
        let roles = roster.pair(AgentId::for_stage(template.kind())).clone();
        Self::new(template, roles, gateway)
    }

    /// Runs the producer and validator calls without the fallback.
    pub async fn try_execute(&self, input: StageInput<'_>) -> Result<RecordBody, GatewayError> {
        let task = self.template.producer_task(input);
        debug!(stage = %self.template.kind(), role = %self.roles.producer.name, "Requesting draft");
        let draft = require_text(self.gateway.complete(&self.roles.producer, &task).await?)?;

        let review = self.template.validator_task(&draft);
        debug!(stage = %self.template.kind(), role = %self.roles.validator.name, "Requesting review");
        let reviewed = require_text(self.gateway.complete(&self.roles.validator, &review).await?)?;

        Ok(self.template.success_record(input, reviewed))
    }
}

impl<T: Debug> Debug for AgentStage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentStage")
            .field("template", &self.template)
            .field("producer", &self.roles.producer.name)
            .field("validator", &self.roles.validator.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: StageTemplate> Stage for AgentStage<T> {
    fn kind(&self) -> StageKind {
        self.template.kind()
    }

    async fn execute(&self, input: StageInput<'_>) -> StageRecord {
        match self.try_execute(input).await {
            Ok(body) => StageRecord::produced(body),
            Err(err) => {
                warn!(
                    stage = %self.template.kind(),
                    error_kind = err.kind(),
                    error = %err,
                    "Completion failed, substituting fallback record"
                );
                StageRecord::fallback(self.template.fallback_record(input), err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RecordOrigin, UserRequest};
    use crate::gateway::MockCompletionGateway;
    use crate::stages::IntentTemplate;
    use mockall::Sequence;

    fn stage_with(mock: MockCompletionGateway) -> AgentStage<IntentTemplate> {
        AgentStage::from_roster(Arc::new(mock), &AgentRoster::new())
    }

    #[tokio::test]
    async fn test_producer_then_validator() {
        let mut mock = MockCompletionGateway::new();
        let mut seq = Sequence::new();
        mock.expect_complete()
            .withf(|role, task| role.name == "Intent Analyst" && task.contains("I want personalized coaching"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("draft analysis".to_string()));
        mock.expect_complete()
            .withf(|role, task| role.name == "Intent Supervisor" && task.ends_with("draft analysis"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("final analysis".to_string()));

        let stage = stage_with(mock);
        let request = UserRequest::new("I want personalized coaching");
        let record = stage.execute(StageInput::Request(&request)).await;

        assert_eq!(record.origin(), RecordOrigin::Produced);
        assert!(record.reviewed());
        assert_eq!(record.payload(), "final analysis");
    }

    #[tokio::test]
    async fn test_producer_failure_skips_validator() {
        let mut mock = MockCompletionGateway::new();
        mock.expect_complete()
            .times(1)
            .returning(|_, _| Err(GatewayError::transport("connection refused")));

        let stage = stage_with(mock);
        let request = UserRequest::new("test");
        let record = stage.execute(StageInput::Request(&request)).await;

        assert!(record.is_fallback());
        assert_eq!(record.payload(), "Intent analysis: test");
        assert!(record.fallback_cause().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_blank_review_is_a_failure() {
        let mut mock = MockCompletionGateway::new();
        mock.expect_complete()
            .withf(|role, _| role.name == "Intent Analyst")
            .returning(|_, _| Ok("draft".to_string()));
        mock.expect_complete()
            .withf(|role, _| role.name == "Intent Supervisor")
            .returning(|_, _| Ok("   ".to_string()));

        let stage = stage_with(mock);
        let request = UserRequest::new("test");

        let err = stage.try_execute(StageInput::Request(&request)).await.unwrap_err();
        assert_eq!(err, GatewayError::EmptyResponse);

        let record = stage.execute(StageInput::Request(&request)).await;
        assert!(record.is_fallback());
    }

    #[test]
    fn test_validator_task_lists_checklist() {
        let template = IntentTemplate;
        let task = template.validator_task("the draft");

        for item in template.checklist() {
            assert!(task.contains(item));
        }
        assert!(task.ends_with("Draft:\nthe draft"));
    }

    #[test]
    fn test_debug_names_roles() {
        let stage = stage_with(MockCompletionGateway::new());
        let text = format!("{stage:?}");
        assert!(text.contains("Intent Analyst"));
        assert!(text.contains("Intent Supervisor"));
    }
}
