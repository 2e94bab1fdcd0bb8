//! Static liveness information about the agents.

use super::AgentId;
use serde::{Deserialize, Serialize};

/// Liveness of one agent.
///
/// Not derived from runtime metrics: every agent is reported `active` and
/// `last_activity` is the time the orchestrator was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    /// Agent id.
    pub agent_id: String,
    /// Liveness label.
    pub status: String,
    /// ISO 8601 timestamp.
    pub last_activity: String,
}

impl AgentStatus {
    /// Creates an `active` status for an agent.
    #[must_use]
    pub fn active(agent: AgentId, last_activity: impl Into<String>) -> Self {
        Self {
            agent_id: agent.as_str().to_string(),
            status: "active".to_string(),
            last_activity: last_activity.into(),
        }
    }
}

/// Overall service health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Health label.
    pub status: String,
    /// Agent ids served.
    pub agents: Vec<String>,
}

impl HealthReport {
    /// Creates a `healthy` report listing every agent.
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            agents: AgentId::ALL.iter().map(|a| a.as_str().to_string()).collect(),
        }
    }
}
