//! The fixed set of pipeline agents and their roles.

mod roles;
mod status;

pub use roles::{AgentRole, AgentRoster, RoleDuty, RolePair};
pub use status::{AgentStatus, HealthReport};

use crate::core::StageKind;
use crate::errors::UnknownAgentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four pipeline agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    /// Owns intent classification.
    Intent,
    /// Owns requirements analysis.
    Project,
    /// Owns technical design.
    Technical,
    /// Owns release planning.
    Release,
}

impl AgentId {
    /// All agents in pipeline order.
    pub const ALL: [Self; 4] = [Self::Intent, Self::Project, Self::Technical, Self::Release];

    /// Returns the agent id used by status queries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Project => "project",
            Self::Technical => "technical",
            Self::Release => "release",
        }
    }

    /// The stage this agent runs.
    #[must_use]
    pub fn stage(&self) -> StageKind {
        match self {
            Self::Intent => StageKind::Intent,
            Self::Project => StageKind::Requirements,
            Self::Technical => StageKind::Design,
            Self::Release => StageKind::Release,
        }
    }

    /// The agent that runs a stage.
    #[must_use]
    pub fn for_stage(kind: StageKind) -> Self {
        match kind {
            StageKind::Intent => Self::Intent,
            StageKind::Requirements => Self::Project,
            StageKind::Design => Self::Technical,
            StageKind::Release => Self::Release,
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentId {
    type Err = UnknownAgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intent" => Ok(Self::Intent),
            "project" => Ok(Self::Project),
            "technical" => Ok(Self::Technical),
            "release" => Ok(Self::Release),
            other => Err(UnknownAgentError::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_agents() {
        for agent in AgentId::ALL {
            assert_eq!(agent.as_str().parse::<AgentId>().unwrap(), agent);
        }
    }

    #[test]
    fn test_parse_unknown_agent() {
        let err = "nonexistent".parse::<AgentId>().unwrap_err();
        assert_eq!(err.agent_id, "nonexistent");
    }

    #[test]
    fn test_stage_mapping_roundtrips() {
        for agent in AgentId::ALL {
            assert_eq!(AgentId::for_stage(agent.stage()), agent);
        }
    }
}
