//! Error types for the agentflow pipeline.
//!
//! Errors are contained at the smallest boundary that can recover from them:
//! [`GatewayError`] never leaves a stage, [`AggregationError`] becomes the
//! `Failed` status of a run, and [`UnknownAgentError`] is the "not found"
//! answer of the per-agent queries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for agentflow operations.
#[derive(Debug, Error)]
pub enum AgentflowError {
    /// A completion call failed.
    #[error("{0}")]
    Gateway(#[from] GatewayError),

    /// The orchestrator could not assemble a run from its stage records.
    #[error("{0}")]
    Aggregation(#[from] AggregationError),

    /// An agent id outside the fixed roster was requested.
    #[error("{0}")]
    UnknownAgent(#[from] UnknownAgentError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentflowError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns true if this is a "not found" condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownAgent(_))
    }
}

/// Errors raised by a completion gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request never reached the backend or the connection dropped.
    #[error("Gateway transport error: {message}")]
    Transport {
        /// Transport failure description.
        message: String,
    },

    /// The backend did not answer in time.
    #[error("Gateway timed out after {seconds}s")]
    Timeout {
        /// Elapsed seconds before giving up.
        seconds: u64,
    },

    /// The backend rejected the call because of rate limiting.
    #[error("Gateway rate limited{}", .retry_after.map_or(String::new(), |s| format!(" (retry after {s}s)")))]
    RateLimited {
        /// Seconds suggested by the backend before retrying.
        retry_after: Option<u64>,
    },

    /// The backend answered with a non-success status.
    #[error("Gateway API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The response could not be interpreted.
    #[error("Malformed gateway response: {reason}")]
    Malformed {
        /// What was wrong with the response.
        reason: String,
    },

    /// The backend answered with no usable text.
    #[error("Gateway returned an empty completion")]
    EmptyResponse,
}

impl GatewayError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a malformed-response error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Creates an API status error.
    #[must_use]
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Short machine-readable name of the failure kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Timeout { .. } => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::Api { .. } => "api",
            Self::Malformed { .. } => "malformed",
            Self::EmptyResponse => "empty_response",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("GatewayError"));
        map.insert("kind".to_string(), serde_json::json!(self.kind()));

        match self {
            Self::Api { status, .. } => {
                map.insert("status".to_string(), serde_json::json!(status));
            }
            Self::Timeout { seconds } => {
                map.insert("timeout_seconds".to_string(), serde_json::json!(seconds));
            }
            Self::RateLimited {
                retry_after: Some(secs),
            } => {
                map.insert("retry_after".to_string(), serde_json::json!(secs));
            }
            _ => {}
        }

        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Error raised when a run cannot be assembled from its stage records.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Workflow aggregation failed for run '{run_id}': {message}")]
pub struct AggregationError {
    /// The run being assembled.
    pub run_id: String,
    /// The stage whose record was rejected, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Human-readable cause.
    pub message: String,
}

impl AggregationError {
    /// Creates a new aggregation error.
    #[must_use]
    pub fn new(run_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            stage: None,
            message: message.into(),
        }
    }

    /// Sets the stage involved.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("AggregationError"));
        map.insert("run_id".to_string(), serde_json::json!(self.run_id));
        if let Some(ref stage) = self.stage {
            map.insert("stage".to_string(), serde_json::json!(stage));
        }
        map.insert("message".to_string(), serde_json::json!(self.message));
        map
    }
}

/// Error raised when an agent id is not one of the four pipeline agents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Agent not found: {agent_id}")]
pub struct UnknownAgentError {
    /// The requested agent id.
    pub agent_id: String,
}

impl UnknownAgentError {
    /// Creates a new unknown agent error.
    #[must_use]
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("UnknownAgentError"));
        map.insert("agent_id".to_string(), serde_json::json!(self.agent_id));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_kinds() {
        assert_eq!(GatewayError::transport("reset").kind(), "transport");
        assert_eq!(GatewayError::Timeout { seconds: 30 }.kind(), "timeout");
        assert_eq!(GatewayError::EmptyResponse.kind(), "empty_response");
        assert_eq!(GatewayError::api(500, "boom").kind(), "api");
    }

    #[test]
    fn test_rate_limited_display() {
        let err = GatewayError::RateLimited {
            retry_after: Some(20),
        };
        assert_eq!(err.to_string(), "Gateway rate limited (retry after 20s)");

        let err = GatewayError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "Gateway rate limited");
    }

    #[test]
    fn test_gateway_error_to_dict() {
        let dict = GatewayError::api(429, "slow down").to_dict();
        assert_eq!(dict.get("kind").unwrap(), "api");
        assert_eq!(dict.get("status").unwrap(), 429);
        assert!(dict
            .get("message")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("slow down"));
    }

    #[test]
    fn test_aggregation_error() {
        let err = AggregationError::new("wf_1", "record out of order").with_stage("design");

        assert!(err.to_string().contains("wf_1"));
        assert!(err.to_string().contains("record out of order"));
        let dict = err.to_dict();
        assert_eq!(dict.get("stage").unwrap(), "design");
    }

    #[test]
    fn test_unknown_agent_is_not_found() {
        let err: AgentflowError = UnknownAgentError::new("nonexistent").into();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Agent not found: nonexistent");
    }

    #[test]
    fn test_config_error() {
        let err = AgentflowError::config("missing model");
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Configuration error: missing model");
    }
}
