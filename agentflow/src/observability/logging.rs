//! Global `tracing` subscriber setup.

use crate::config::LoggingConfig;
use crate::errors::AgentflowError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber described by `config`.
///
/// Fails if the filter directive does not parse or a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), AgentflowError> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| AgentflowError::config(format!("invalid log filter '{}': {e}", config.filter)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry.with(fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    installed.map_err(|e| AgentflowError::config(format!("failed to install subscriber: {e}")))
}
