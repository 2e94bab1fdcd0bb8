//! Structured attributes attached to run and stage events.

use crate::core::{StageKind, StageRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// Attributes describing one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSpanAttributes {
    /// Pipeline name.
    pub pipeline_name: Option<String>,
    /// Run id.
    pub run_id: Option<String>,
    /// Caller identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Digest of intent and context.
    pub input_digest: Option<String>,
    /// Final run status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Records collected so far.
    pub stage_count: usize,
    /// Number of fallback records.
    pub fallback_count: usize,
    /// Wall time of the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Failure cause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSpanAttributes {
    /// Creates empty run attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pipeline name.
    #[must_use]
    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = Some(name.into());
        self
    }

    /// Sets the run id.
    #[must_use]
    pub fn with_run_id(mut self, id: impl Into<String>) -> Self {
        self.run_id = Some(id.into());
        self
    }

    /// Sets the user id, if any.
    #[must_use]
    pub fn with_user_id(mut self, user_id: Option<&str>) -> Self {
        self.user_id = user_id.map(str::to_string);
        self
    }

    /// Sets the input digest.
    #[must_use]
    pub fn with_input_digest(mut self, digest: impl Into<String>) -> Self {
        self.input_digest = Some(digest.into());
        self
    }

    /// Sets the final status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Counts the records and fallbacks of a run.
    #[must_use]
    pub fn with_records(mut self, records: &[StageRecord]) -> Self {
        self.stage_count = records.len();
        self.fallback_count = records.iter().filter(|r| r.is_fallback()).count();
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the failure cause.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Flattens to dotted attribute names.
    #[must_use]
    pub fn to_attributes(&self) -> BTreeMap<String, String> {
        let mut attrs = BTreeMap::new();
        if let Some(ref v) = self.pipeline_name {
            attrs.insert("pipeline.name".to_string(), v.clone());
        }
        if let Some(ref v) = self.run_id {
            attrs.insert("pipeline.run_id".to_string(), v.clone());
        }
        if let Some(ref v) = self.user_id {
            attrs.insert("pipeline.user_id".to_string(), v.clone());
        }
        if let Some(ref v) = self.input_digest {
            attrs.insert("pipeline.input_digest".to_string(), v.clone());
        }
        if let Some(ref v) = self.status {
            attrs.insert("pipeline.status".to_string(), v.clone());
        }
        attrs.insert("pipeline.stage_count".to_string(), self.stage_count.to_string());
        attrs.insert("pipeline.fallback_count".to_string(), self.fallback_count.to_string());
        if let Some(v) = self.duration_ms {
            attrs.insert("pipeline.duration_ms".to_string(), format!("{v:.3}"));
        }
        if let Some(ref v) = self.error {
            attrs.insert("pipeline.error".to_string(), v.clone());
        }
        attrs
    }

    /// Serializes to an event payload.
    #[must_use]
    pub fn to_event_data(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Attributes describing one stage invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpanAttributes {
    /// Owning run.
    pub run_id: String,
    /// Stage name.
    pub stage: StageKind,
    /// Agent name in workflow responses.
    pub agent: String,
    /// Produced or fallback.
    pub origin: String,
    /// Record confidence.
    pub confidence: f64,
    /// Whether the validator reviewed the output.
    pub reviewed: bool,
    /// Wall time of the stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Why the fallback was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_cause: Option<String>,
}

impl StageSpanAttributes {
    /// Describes a record returned by a stage.
    #[must_use]
    pub fn for_record(run_id: impl Into<String>, record: &StageRecord) -> Self {
        Self {
            run_id: run_id.into(),
            stage: record.kind(),
            agent: record.kind().agent_name().to_string(),
            origin: record.origin().to_string(),
            confidence: record.confidence(),
            reviewed: record.reviewed(),
            duration_ms: None,
            fallback_cause: record.fallback_cause().map(str::to_string),
        }
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Serializes to an event payload.
    #[must_use]
    pub fn to_event_data(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Measures wall time of a span.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}
