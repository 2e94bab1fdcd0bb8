//! Configuration types for the gateway, the pipeline and logging.
//!
//! Configuration is plain serde data with defaults for every field, so an
//! empty JSON object is a valid configuration. Environment variables
//! override file values:
//!
//! | Variable                | Field                 |
//! |-------------------------|-----------------------|
//! | `OPENAI_API_KEY`        | `gateway.api_key`     |
//! | `AGENTFLOW_MODEL`       | `gateway.model`       |
//! | `AGENTFLOW_GATEWAY_URL` | `gateway.base_url`    |
//! | `AGENTFLOW_LOG`         | `logging.filter`      |

use crate::agents::{AgentId, AgentRoster};
use crate::errors::AgentflowError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentflowConfig {
    /// Completion backend settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Pipeline settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the HTTP completion gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Bearer token. Never serialized.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Per-request timeout. `None` leaves calls unbounded.
    #[serde(default)]
    pub request_timeout_seconds: Option<f64>,
    /// Completion length cap.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            request_timeout_seconds: None,
            max_tokens: None,
        }
    }
}

impl GatewayConfig {
    /// Creates a gateway configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets a per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.request_timeout_seconds = Some(seconds);
        self
    }

    /// Gets the timeout as a Duration, if one is set.
    ///
    /// Fails when the value is not positive or does not fit a `Duration`.
    pub fn timeout(&self) -> Result<Option<Duration>, AgentflowError> {
        let Some(secs) = self.request_timeout_seconds else {
            return Ok(None);
        };
        if secs <= 0.0 {
            return Err(AgentflowError::config(
                "gateway.request_timeout_seconds must be positive",
            ));
        }
        Duration::try_from_secs_f64(secs).map(Some).map_err(|_| {
            AgentflowError::config(format!(
                "gateway.request_timeout_seconds is out of range: {secs}"
            ))
        })
    }
}

/// Settings for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name used in spans and events.
    #[serde(default = "default_pipeline_name")]
    pub name: String,
    /// Per-agent sampling temperature overrides.
    #[serde(default)]
    pub temperatures: BTreeMap<AgentId, f32>,
}

fn default_pipeline_name() -> String {
    "agentflow".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_pipeline_name(),
            temperatures: BTreeMap::new(),
        }
    }
}

/// Settings for the tracing subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl AgentflowConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, AgentflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AgentflowError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, AgentflowError> {
        let config = Self::default().with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|v| !v.is_empty()) {
            self.gateway.api_key = Some(key);
        }
        if let Some(model) = lookup("AGENTFLOW_MODEL").filter(|v| !v.is_empty()) {
            self.gateway.model = model;
        }
        if let Some(url) = lookup("AGENTFLOW_GATEWAY_URL").filter(|v| !v.is_empty()) {
            self.gateway.base_url = url;
        }
        if let Some(filter) = lookup("AGENTFLOW_LOG").filter(|v| !v.is_empty()) {
            self.logging.filter = filter;
        }
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), AgentflowError> {
        if self.gateway.model.trim().is_empty() {
            return Err(AgentflowError::config("gateway.model must not be empty"));
        }
        if !self.gateway.base_url.starts_with("http://") && !self.gateway.base_url.starts_with("https://") {
            return Err(AgentflowError::config(format!(
                "gateway.base_url must be an http(s) URL, got '{}'",
                self.gateway.base_url
            )));
        }
        self.gateway.timeout()?;
        for (agent, temperature) in &self.pipeline.temperatures {
            if !(0.0..=2.0).contains(temperature) {
                return Err(AgentflowError::config(format!(
                    "temperature for agent '{agent}' must be within [0, 2], got {temperature}"
                )));
            }
        }
        Ok(())
    }

    /// Builds the agent roster with temperature overrides applied.
    #[must_use]
    pub fn roster(&self) -> AgentRoster {
        self.pipeline
            .temperatures
            .iter()
            .fold(AgentRoster::new(), |roster, (agent, t)| roster.with_temperature(*agent, *t))
    }
}
