//! Scriptable gateway and stage doubles.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::agents::AgentRole;
use crate::core::{StageKind, StageRecord};
use crate::errors::GatewayError;
use crate::gateway::CompletionGateway;
use crate::stages::{Stage, StageInput};

/// One call received by a [`StubGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    /// Name of the role asked.
    pub role: String,
    /// Task text.
    pub task: String,
}

/// A deterministic in-memory gateway.
///
/// Replies `"{role name} reply"` unless scripted otherwise. Roles can be
/// made to fail or to never answer.
#[derive(Debug, Default)]
pub struct StubGateway {
    replies: HashMap<String, String>,
    failures: HashMap<String, GatewayError>,
    fail_all: Option<GatewayError>,
    hanging: HashSet<String>,
    latency: Option<Duration>,
    calls: Mutex<Vec<GatewayCall>>,
}

impl StubGateway {
    /// Creates a stub where every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the reply of one role.
    #[must_use]
    pub fn with_reply(mut self, role: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies.insert(role.into(), reply.into());
        self
    }

    /// Makes every call to `role` fail.
    #[must_use]
    pub fn failing_role(mut self, role: impl Into<String>, error: GatewayError) -> Self {
        self.failures.insert(role.into(), error);
        self
    }

    /// Makes every call fail.
    #[must_use]
    pub fn failing_all(mut self, error: GatewayError) -> Self {
        self.fail_all = Some(error);
        self
    }

    /// Makes calls to `role` never complete.
    #[must_use]
    pub fn hanging_on(mut self, role: impl Into<String>) -> Self {
        self.hanging.insert(role.into());
        self
    }

    /// Delays every reply.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// All calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls addressed to one role.
    #[must_use]
    pub fn calls_for(&self, role: &str) -> Vec<GatewayCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.role == role)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CompletionGateway for StubGateway {
    async fn complete(&self, role: &AgentRole, task: &str) -> Result<String, GatewayError> {
        self.calls.lock().push(GatewayCall {
            role: role.name.clone(),
            task: task.to_string(),
        });

        if self.hanging.contains(&role.name) {
            std::future::pending::<()>().await;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(ref err) = self.fail_all {
            return Err(err.clone());
        }
        if let Some(err) = self.failures.get(&role.name) {
            return Err(err.clone());
        }

        Ok(self
            .replies
            .get(&role.name)
            .cloned()
            .unwrap_or_else(|| format!("{} reply", role.name)))
    }
}

/// A stage that always returns the same record, whatever slot it fills.
#[derive(Debug, Clone)]
pub struct FixedStage {
    kind: StageKind,
    record: StageRecord,
    calls: Arc<Mutex<usize>>,
}

impl FixedStage {
    /// Creates a stage reporting the record's own kind.
    #[must_use]
    pub fn new(record: StageRecord) -> Self {
        Self {
            kind: record.kind(),
            record,
            calls: Arc::default(),
        }
    }

    /// Number of times the stage ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl Stage for FixedStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn execute(&self, _input: StageInput<'_>) -> StageRecord {
        *self.calls.lock() += 1;
        self.record.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentId, AgentRoster};

    #[tokio::test]
    async fn test_stub_default_and_scripted_replies() {
        let roster = AgentRoster::new();
        let stub = StubGateway::new().with_reply("Intent Supervisor", "scripted");

        let a = stub.complete(roster.producer(AgentId::Intent), "t1").await.unwrap();
        let b = stub.complete(roster.validator(AgentId::Intent), "t2").await.unwrap();

        assert_eq!(a, "Intent Analyst reply");
        assert_eq!(b, "scripted");
        assert_eq!(stub.call_count(), 2);
        assert_eq!(stub.calls_for("Intent Analyst")[0].task, "t1");
    }

    #[tokio::test]
    async fn test_stub_failures() {
        let roster = AgentRoster::new();
        let stub = StubGateway::new().failing_role("Technical Architect", GatewayError::EmptyResponse);

        assert!(stub.complete(roster.producer(AgentId::Technical), "t").await.is_err());
        assert!(stub.complete(roster.producer(AgentId::Release), "t").await.is_ok());

        let all = StubGateway::new().failing_all(GatewayError::transport("down"));
        assert!(all.complete(roster.okr_monitor(), "t").await.is_err());
    }

    #[tokio::test]
    async fn test_stub_hang() {
        let roster = AgentRoster::new();
        let stub = StubGateway::new().hanging_on("Release Coordinator");

        let result = tokio::time::timeout(
            Duration::from_millis(20),
            stub.complete(roster.producer(AgentId::Release), "t"),
        )
        .await;
        assert!(result.is_err());
    }
}
