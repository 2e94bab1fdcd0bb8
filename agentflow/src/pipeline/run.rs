//! The aggregate of one pipeline execution and its wire response.

use crate::core::{RunStatus, StageKind, StageRecord, UserRequest};
use crate::errors::AggregationError;
use crate::utils::{input_digest, now_utc, Timestamp};
use serde::{Deserialize, Serialize};

/// One execution of the four-stage pipeline.
///
/// Records are appended only after passing the aggregation checks, so a
/// completed run holds exactly one record per stage in pipeline order and a
/// failed run holds fewer than four.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    run_id: String,
    request: UserRequest,
    input_digest: String,
    stage_records: Vec<StageRecord>,
    status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    final_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<AggregationError>,
    started_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finished_at: Option<Timestamp>,
}

impl PipelineRun {
    /// Starts a run for a request.
    #[must_use]
    pub fn new(run_id: impl Into<String>, request: UserRequest) -> Self {
        Self {
            run_id: run_id.into(),
            input_digest: input_digest(&request),
            request,
            stage_records: Vec::with_capacity(StageKind::ALL.len()),
            status: RunStatus::InProgress,
            final_output: None,
            error: None,
            started_at: now_utc(),
            finished_at: None,
        }
    }

    /// Run id.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The request that seeded the run.
    #[must_use]
    pub fn request(&self) -> &UserRequest {
        &self.request
    }

    /// SHA-256 hex digest of the request's intent and context.
    #[must_use]
    pub fn input_digest(&self) -> &str {
        &self.input_digest
    }

    /// Accepted records, in pipeline order.
    #[must_use]
    pub fn records(&self) -> &[StageRecord] {
        &self.stage_records
    }

    /// The accepted record of a stage.
    #[must_use]
    pub fn record(&self, kind: StageKind) -> Option<&StageRecord> {
        self.stage_records.get(kind.position())
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// The release record's payload, once completed.
    #[must_use]
    pub fn final_output(&self) -> Option<&str> {
        self.final_output.as_deref()
    }

    /// Why the run failed.
    #[must_use]
    pub fn error(&self) -> Option<&AggregationError> {
        self.error.as_ref()
    }

    /// When the run started.
    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// When the run reached a terminal status.
    #[must_use]
    pub fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    /// Number of fallback records.
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.stage_records.iter().filter(|r| r.is_fallback()).count()
    }

    /// Checks a record against the stage slot it fills and appends it.
    ///
    /// On violation the run becomes `Failed`, the record is dropped and the
    /// error is returned.
    pub fn accept(&mut self, expected: StageKind, record: StageRecord) -> Result<(), AggregationError> {
        let check = self.check_record(expected, &record);
        match check {
            Ok(()) => {
                self.stage_records.push(record);
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn check_record(&self, expected: StageKind, record: &StageRecord) -> Result<(), AggregationError> {
        let rejected = |message: String| {
            AggregationError::new(self.run_id.clone(), message).with_stage(expected.as_str())
        };

        if self.status.is_terminal() {
            return Err(rejected(format!("run is already {}", self.status)));
        }
        if self.stage_records.len() != expected.position() {
            return Err(rejected(format!(
                "{expected} record arrived out of order after {} record(s)",
                self.stage_records.len()
            )));
        }
        if record.kind() != expected {
            return Err(rejected(format!(
                "expected a {expected} record, got a {} record",
                record.kind()
            )));
        }
        let confidence = record.confidence();
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(rejected(format!("confidence {confidence} is outside [0, 1]")));
        }
        // The release payload becomes the final output.
        if expected == StageKind::Release && record.payload().trim().is_empty() {
            return Err(rejected("release record has an empty payload".to_string()));
        }
        Ok(())
    }

    /// Marks the run `Completed`, taking the release payload as final output.
    pub fn complete(&mut self) -> Result<(), AggregationError> {
        if self.stage_records.len() != StageKind::ALL.len() {
            let err = AggregationError::new(
                self.run_id.clone(),
                format!("expected {} records, got {}", StageKind::ALL.len(), self.stage_records.len()),
            );
            return Err(self.fail(err));
        }

        self.final_output = self.record(StageKind::Release).map(|r| r.payload().to_string());
        self.status = RunStatus::Completed;
        self.finished_at = Some(now_utc());
        Ok(())
    }

    fn fail(&mut self, err: AggregationError) -> AggregationError {
        self.status = RunStatus::Failed;
        self.final_output = None;
        self.error = Some(err.clone());
        self.finished_at = Some(now_utc());
        err
    }

    /// Builds the response shape returned to callers.
    #[must_use]
    pub fn to_response(&self) -> WorkflowResponse {
        let per_stage_responses = self
            .stage_records
            .iter()
            .map(|record| {
                let kind = record.kind();
                PerStageResponse {
                    agent_id: kind.agent_name().to_string(),
                    response: record.payload().to_string(),
                    confidence: record.confidence(),
                    next_agent: kind.next().map(|n| n.agent_name().to_string()),
                }
            })
            .collect();

        WorkflowResponse {
            run_id: self.run_id.clone(),
            status: self.status,
            per_stage_responses,
            final_output: self.final_output.clone().unwrap_or_default(),
        }
    }

    /// Converts a terminal run into its response, or its failure cause.
    pub fn into_response(self) -> Result<WorkflowResponse, AggregationError> {
        match self.error {
            Some(ref err) => Err(err.clone()),
            None => Ok(self.to_response()),
        }
    }
}

/// One stage's contribution to a [`WorkflowResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerStageResponse {
    /// Agent that ran the stage (`intent_manager`, ...).
    pub agent_id: String,
    /// The record payload.
    pub response: String,
    /// The record confidence.
    pub confidence: f64,
    /// The following agent, absent for the last stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_agent: Option<String>,
}

/// The caller-facing result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResponse {
    /// Run id.
    pub run_id: String,
    /// Terminal status.
    pub status: RunStatus,
    /// One entry per accepted record.
    pub per_stage_responses: Vec<PerStageResponse>,
    /// The release payload.
    pub final_output: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{
        DesignTemplate, IntentTemplate, ReleaseTemplate, RequirementsTemplate, StageInput,
        StageTemplate,
    };
    use pretty_assertions::assert_eq;

    fn produced(kind: StageKind, request: &UserRequest) -> StageRecord {
        let input = StageInput::Request(request);
        let text = format!("{kind} output");
        let body = match kind {
            StageKind::Intent => IntentTemplate.success_record(input, text),
            StageKind::Requirements => RequirementsTemplate.success_record(input, text),
            StageKind::Design => DesignTemplate.success_record(input, text),
            StageKind::Release => ReleaseTemplate.success_record(input, text),
        };
        StageRecord::produced(body)
    }

    #[test]
    fn test_complete_run() {
        let request = UserRequest::new("coach me");
        let mut run = PipelineRun::new("wf_anonymous_1", request.clone());
        for kind in StageKind::ALL {
            run.accept(kind, produced(kind, &request)).unwrap();
        }
        run.complete().unwrap();

        assert_eq!(run.status(), RunStatus::Completed);
        assert_eq!(run.final_output(), Some("release output"));
        assert!(run.finished_at().is_some());
        assert!(run.error().is_none());

        let response = run.into_response().unwrap();
        assert_eq!(response.per_stage_responses.len(), 4);
        assert_eq!(response.per_stage_responses[0].agent_id, "intent_manager");
        assert_eq!(
            response.per_stage_responses[0].next_agent.as_deref(),
            Some("project_manager")
        );
        assert!(response.per_stage_responses[3].next_agent.is_none());
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let request = UserRequest::new("coach me");
        let mut run = PipelineRun::new("wf_anonymous_2", request.clone());
        run.accept(StageKind::Intent, produced(StageKind::Intent, &request)).unwrap();

        let err = run
            .accept(StageKind::Requirements, produced(StageKind::Design, &request))
            .unwrap_err();

        assert_eq!(err.stage.as_deref(), Some("requirements"));
        assert!(err.message.contains("got a design record"));
        assert_eq!(run.status(), RunStatus::Failed);
        assert_eq!(run.records().len(), 1);
        assert!(run.final_output().is_none());
        assert!(run.clone().into_response().is_err());
    }

    #[test]
    fn test_incomplete_run_cannot_complete() {
        let request = UserRequest::new("coach me");
        let mut run = PipelineRun::new("wf_anonymous_3", request.clone());
        run.accept(StageKind::Intent, produced(StageKind::Intent, &request)).unwrap();

        assert!(run.complete().is_err());
        assert_eq!(run.status(), RunStatus::Failed);
        assert!(run.error().unwrap().message.contains("expected 4 records, got 1"));
    }

    #[test]
    fn test_blank_release_payload_is_rejected_before_append() {
        let request = UserRequest::new("coach me");
        let mut run = PipelineRun::new("wf_anonymous_5", request.clone());
        for kind in &StageKind::ALL[..3] {
            run.accept(*kind, produced(*kind, &request)).unwrap();
        }
        let blank = StageRecord::produced(
            ReleaseTemplate.success_record(StageInput::Request(&request), "  \n".to_string()),
        );

        let err = run.accept(StageKind::Release, blank).unwrap_err();

        assert_eq!(err.stage.as_deref(), Some("release"));
        assert_eq!(run.status(), RunStatus::Failed);
        assert_eq!(run.records().len(), 3);
        assert!(run.final_output().is_none());
        assert!(run.complete().is_err());
    }

    #[test]
    fn test_no_records_after_failure() {
        let request = UserRequest::new("coach me");
        let mut run = PipelineRun::new("wf_anonymous_4", request.clone());
        let _ = run.accept(StageKind::Requirements, produced(StageKind::Requirements, &request));

        assert!(run.accept(StageKind::Intent, produced(StageKind::Intent, &request)).is_err());
        assert!(run.records().is_empty());
    }

    #[test]
    fn test_response_wire_shape() {
        let request = UserRequest::new("coach me");
        let mut run = PipelineRun::new("wf_u_5", request.clone());
        for kind in StageKind::ALL {
            run.accept(kind, produced(kind, &request)).unwrap();
        }
        run.complete().unwrap();

        let json = serde_json::to_value(run.to_response()).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["final_output"], "release output");
        assert_eq!(json["per_stage_responses"][1]["agent_id"], "project_manager");
        assert!(json["per_stage_responses"][3].get("next_agent").is_none());
    }
}
