//! Stage kind, record origin and run status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Intent classification.
    Intent,
    /// Functional requirements analysis.
    Requirements,
    /// Technical solution design.
    Design,
    /// Release and delivery planning.
    Release,
}

impl StageKind {
    /// All stages in pipeline order.
    pub const ALL: [Self; 4] = [Self::Intent, Self::Requirements, Self::Design, Self::Release];

    /// Returns the stage name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Requirements => "requirements",
            Self::Design => "design",
            Self::Release => "release",
        }
    }

    /// Zero-based position of the stage in the pipeline.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::Intent => 0,
            Self::Requirements => 1,
            Self::Design => 2,
            Self::Release => 3,
        }
    }

    /// Returns the stage that follows this one, if any.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        Self::ALL.get(self.position() + 1).copied()
    }

    /// Name of the agent that owns this stage in workflow responses.
    #[must_use]
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::Intent => "intent_manager",
            Self::Requirements => "project_manager",
            Self::Design => "technical_lead",
            Self::Release => "release_manager",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a stage record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    /// Both completion calls succeeded.
    Produced,
    /// A completion call failed and the static fallback was substituted.
    Fallback,
}

impl fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Produced => write!(f, "produced"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// The status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Stages are still executing.
    #[default]
    InProgress,
    /// All four stages returned and the run was assembled.
    Completed,
    /// The run was aborted during aggregation.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl RunStatus {
    /// Returns true if the run has finished, successfully or not.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}
