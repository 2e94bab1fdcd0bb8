//! The four pipeline stages.
//!
//! A stage turns its input (the user request for the first stage, the
//! previous stage's record afterwards) into exactly one [`StageRecord`].
//! Gateway failures never escape a stage: they are replaced by the stage's
//! fallback record.

mod agent_stage;
mod design;
mod intent;
mod release;
mod requirements;

pub use agent_stage::{AgentStage, StageTemplate};
pub use design::{DesignStage, DesignTemplate};
pub use intent::{IntentStage, IntentTemplate};
pub use release::{ReleaseStage, ReleaseTemplate};
pub use requirements::{RequirementsStage, RequirementsTemplate};

use crate::core::{StageKind, StageRecord, UserRequest};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// What a stage receives.
#[derive(Debug, Clone, Copy)]
pub enum StageInput<'a> {
    /// The original request, for the first stage.
    Request(&'a UserRequest),
    /// The previous stage's record.
    Record(&'a StageRecord),
}

impl StageInput<'_> {
    /// Text a fallback record interpolates: the intent of a request, or the
    /// payload of a previous record. Blank values read as `N/A`.
    #[must_use]
    pub fn subject(&self) -> &str {
        let text = match self {
            Self::Request(request) => request.intent.as_str(),
            Self::Record(record) => record.payload(),
        };
        if text.trim().is_empty() {
            "N/A"
        } else {
            text
        }
    }

    /// Renders the input for embedding in a producer task.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Request(request) => format!(
                "intent: \"{}\"\ncontext: {}",
                request.intent,
                request.render_context()
            ),
            Self::Record(record) => record.render(),
        }
    }
}

/// A pipeline stage.
///
/// Stages are immutable once built and shared across concurrent runs.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// The stage this implementation fills.
    fn kind(&self) -> StageKind;

    /// Returns the name of the stage.
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Executes the stage. Never fails: gateway errors yield the fallback
    /// record.
    async fn execute(&self, input: StageInput<'_>) -> StageRecord;
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

pub(crate) fn string_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
