//! The completion gateway seam.
//!
//! Stages never talk to a model backend directly: they receive an
//! `Arc<dyn CompletionGateway>` at construction time. Everything behind the
//! trait (prompt transport, authentication, model choice) is opaque to the
//! pipeline.

#[cfg(feature = "http-gateway")]
mod openai;

#[cfg(feature = "http-gateway")]
pub use openai::{build_gateway, OpenAiGateway};

use crate::agents::AgentRole;
use crate::errors::GatewayError;
use async_trait::async_trait;

/// An external text-generation capability.
///
/// Implementations must be `Send + Sync`: one gateway is built per process
/// and shared by every concurrent run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Asks the backend to play `role` and carry out `task`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport failure, timeout, rate
    /// limiting, non-success status, or an unreadable response.
    async fn complete(&self, role: &AgentRole, task: &str) -> Result<String, GatewayError>;
}

/// Rejects blank completions.
pub fn require_text(text: String) -> Result<String, GatewayError> {
    if text.trim().is_empty() {
        Err(GatewayError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentId, AgentRoster};

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("ok".to_string()), Ok("ok".to_string()));
        assert_eq!(require_text("  \n".to_string()), Err(GatewayError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_mock_gateway_is_object_safe() {
        let mut mock = MockCompletionGateway::new();
        mock.expect_complete()
            .withf(|role, task| role.name == "Intent Analyst" && task == "classify")
            .times(1)
            .returning(|_, _| Ok("done".to_string()));

        let gateway: Box<dyn CompletionGateway> = Box::new(mock);
        let roster = AgentRoster::new();
        let out = gateway
            .complete(roster.producer(AgentId::Intent), "classify")
            .await
            .unwrap();
        assert_eq!(out, "done");
    }
}
