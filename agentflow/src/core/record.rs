//! Typed stage records.
//!
//! Every stage produces exactly one [`StageRecord`]. The record body is a
//! tagged variant per stage carrying only the fields that stage defines, so
//! a downstream consumer can never read a key the producer did not write.

use super::{RecordOrigin, StageKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Urgency assigned to an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Normal handling.
    Medium,
}

impl Priority {
    /// Returns the priority label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
        }
    }
}

/// Output of the intent classification stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRecord {
    /// Raw analysis text.
    pub analysis: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Intent category label.
    pub category: String,
    /// Assigned priority.
    pub priority: Priority,
    /// Identified needs.
    pub needs: Vec<String>,
    /// Recommended next actions.
    pub recommendations: Vec<String>,
}

/// Output of the requirements analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementsRecord {
    /// Raw requirements text.
    pub requirements: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Objectives to reach.
    pub objectives: Vec<String>,
    /// Acceptance criteria.
    pub acceptance_criteria: Vec<String>,
    /// Expected timeline.
    pub timeline: String,
    /// Resources needed.
    pub resources: Vec<String>,
    /// Identified risks.
    pub risks: Vec<String>,
    /// Success metrics.
    pub success_metrics: Vec<String>,
}

/// Output of the technical design stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRecord {
    /// Raw solution text.
    pub solution: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Architecture components, keyed by layer. `type` holds the style.
    pub architecture: BTreeMap<String, String>,
    /// External integrations.
    pub integrations: Vec<String>,
    /// Security measures.
    pub security: Vec<String>,
    /// Performance choices, keyed by concern.
    pub performance: BTreeMap<String, String>,
    /// Deployment choices, keyed by concern.
    pub deployment: BTreeMap<String, String>,
    /// Effort estimate.
    pub effort_estimation: String,
}

/// How a release is rolled out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStrategy {
    /// Strategy name (blue-green, canary, manual...).
    pub kind: String,
    /// Target environments in promotion order.
    #[serde(default)]
    pub environments: Vec<String>,
    /// Automation tooling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation: Option<String>,
}

/// How a release is reverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackPolicy {
    /// Rollback mode.
    pub strategy: String,
    /// Conditions that trigger a rollback.
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Time budget for the rollback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Who hears about a release and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationPlan {
    /// Audiences.
    #[serde(default)]
    pub stakeholders: Vec<String>,
    /// Channels used.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Update cadence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

/// Output of the release planning stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Raw delivery plan text.
    pub delivery_plan: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Deployment strategy.
    pub deployment_strategy: DeploymentStrategy,
    /// Test tooling, keyed by test level.
    pub testing: BTreeMap<String, String>,
    /// Monitoring tooling, keyed by signal.
    pub monitoring: BTreeMap<String, String>,
    /// Rollback policy.
    pub rollback: RollbackPolicy,
    /// Documentation deliverables.
    pub documentation: Vec<String>,
    /// Communication plan.
    pub communication: CommunicationPlan,
    /// Success metrics.
    pub success_metrics: Vec<String>,
    /// Delivery timeline.
    pub timeline: String,
}

/// Stage-specific record content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RecordBody {
    /// Intent classification output.
    Intent(IntentRecord),
    /// Requirements analysis output.
    Requirements(RequirementsRecord),
    /// Technical design output.
    Design(DesignRecord),
    /// Release planning output.
    Release(ReleaseRecord),
}

impl RecordBody {
    /// The stage this body belongs to.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        match self {
            Self::Intent(_) => StageKind::Intent,
            Self::Requirements(_) => StageKind::Requirements,
            Self::Design(_) => StageKind::Design,
            Self::Release(_) => StageKind::Release,
        }
    }

    /// The stage's confidence score.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Intent(r) => r.confidence,
            Self::Requirements(r) => r.confidence,
            Self::Design(r) => r.confidence,
            Self::Release(r) => r.confidence,
        }
    }

    /// The free text attached to the record.
    #[must_use]
    pub fn payload(&self) -> &str {
        match self {
            Self::Intent(r) => &r.analysis,
            Self::Requirements(r) => &r.requirements,
            Self::Design(r) => &r.solution,
            Self::Release(r) => &r.delivery_plan,
        }
    }
}

/// The normalized output of one stage invocation.
///
/// Records are immutable once created: fields are only reachable through
/// accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    origin: RecordOrigin,
    reviewed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fallback_cause: Option<String>,
    body: RecordBody,
}

impl StageRecord {
    /// Creates a record from a successful producer + validator exchange.
    #[must_use]
    pub fn produced(body: RecordBody) -> Self {
        Self {
            origin: RecordOrigin::Produced,
            reviewed: true,
            fallback_cause: None,
            body,
        }
    }

    /// Creates a fallback record, remembering why it was substituted.
    #[must_use]
    pub fn fallback(body: RecordBody, cause: impl Into<String>) -> Self {
        Self {
            origin: RecordOrigin::Fallback,
            reviewed: false,
            fallback_cause: Some(cause.into()),
            body,
        }
    }

    /// The stage that produced this record.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        self.body.kind()
    }

    /// Whether the record was produced or substituted.
    #[must_use]
    pub fn origin(&self) -> RecordOrigin {
        self.origin
    }

    /// Returns true if this is a fallback record.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.origin == RecordOrigin::Fallback
    }

    /// Returns true if the validator role reviewed the producer's output.
    #[must_use]
    pub fn reviewed(&self) -> bool {
        self.reviewed
    }

    /// Why the fallback was substituted.
    #[must_use]
    pub fn fallback_cause(&self) -> Option<&str> {
        self.fallback_cause.as_deref()
    }

    /// The stage-specific body.
    #[must_use]
    pub fn body(&self) -> &RecordBody {
        &self.body
    }

    /// The confidence score.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.body.confidence()
    }

    /// The free text attached to the record.
    #[must_use]
    pub fn payload(&self) -> &str {
        self.body.payload()
    }

    /// The stage's primary label, if the stage defines one.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        match &self.body {
            RecordBody::Intent(r) => Some(&r.category),
            RecordBody::Requirements(_) => None,
            RecordBody::Design(r) => r.architecture.get("type").map(String::as_str),
            RecordBody::Release(r) => Some(&r.deployment_strategy.kind),
        }
    }

    /// Stage-specific labels.
    #[must_use]
    pub fn tags(&self) -> BTreeMap<&'static str, String> {
        let mut tags = BTreeMap::new();
        match &self.body {
            RecordBody::Intent(r) => {
                tags.insert("category", r.category.clone());
                tags.insert("priority", r.priority.as_str().to_string());
            }
            RecordBody::Requirements(r) => {
                tags.insert("timeline", r.timeline.clone());
            }
            RecordBody::Design(r) => {
                if let Some(style) = r.architecture.get("type") {
                    tags.insert("architecture", style.clone());
                }
                tags.insert("effort_estimation", r.effort_estimation.clone());
            }
            RecordBody::Release(r) => {
                tags.insert("deployment_strategy", r.deployment_strategy.kind.clone());
                tags.insert("rollback", r.rollback.strategy.clone());
                tags.insert("timeline", r.timeline.clone());
            }
        }
        tags.insert("origin", self.origin.to_string());
        tags
    }

    /// Renders the record as plain text for the next stage's task description.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "stage: {}", self.kind());
        let _ = writeln!(out, "origin: {}", self.origin);
        let _ = writeln!(out, "confidence: {:.2}", self.confidence());

        match &self.body {
            RecordBody::Intent(r) => {
                push_field(&mut out, "analysis", &r.analysis);
                push_field(&mut out, "category", &r.category);
                push_field(&mut out, "priority", r.priority.as_str());
                push_list(&mut out, "needs", &r.needs);
                push_list(&mut out, "recommendations", &r.recommendations);
            }
            RecordBody::Requirements(r) => {
                push_field(&mut out, "requirements", &r.requirements);
                push_list(&mut out, "objectives", &r.objectives);
                push_list(&mut out, "acceptance_criteria", &r.acceptance_criteria);
                push_field(&mut out, "timeline", &r.timeline);
                push_list(&mut out, "resources", &r.resources);
                push_list(&mut out, "risks", &r.risks);
                push_list(&mut out, "success_metrics", &r.success_metrics);
            }
            RecordBody::Design(r) => {
                push_field(&mut out, "solution", &r.solution);
                push_map(&mut out, "architecture", &r.architecture);
                push_list(&mut out, "integrations", &r.integrations);
                push_list(&mut out, "security", &r.security);
                push_map(&mut out, "performance", &r.performance);
                push_map(&mut out, "deployment", &r.deployment);
                push_field(&mut out, "effort_estimation", &r.effort_estimation);
            }
            RecordBody::Release(r) => {
                push_field(&mut out, "delivery_plan", &r.delivery_plan);
                push_field(&mut out, "deployment_strategy", &r.deployment_strategy.kind);
                push_list(&mut out, "environments", &r.deployment_strategy.environments);
                push_map(&mut out, "testing", &r.testing);
                push_map(&mut out, "monitoring", &r.monitoring);
                push_field(&mut out, "rollback", &r.rollback.strategy);
                push_list(&mut out, "documentation", &r.documentation);
                push_list(&mut out, "success_metrics", &r.success_metrics);
                push_field(&mut out, "timeline", &r.timeline);
            }
        }

        out
    }
}

fn push_field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{label}: {value}");
}

fn push_list(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        let _ = writeln!(out, "{label}: none");
        return;
    }
    let _ = writeln!(out, "{label}:");
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

fn push_map(out: &mut String, label: &str, entries: &BTreeMap<String, String>) {
    let _ = writeln!(out, "{label}:");
    for (k, v) in entries {
        let _ = writeln!(out, "  {k}: {v}");
    }
}
