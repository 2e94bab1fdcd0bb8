//! The inbound user request that seeds a pipeline run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form context supplied alongside an intent.
pub type ContextMap = BTreeMap<String, serde_json::Value>;

/// A free-text user intent plus optional context and caller identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRequest {
    /// The user's intent, verbatim.
    pub intent: String,
    /// Optional context mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextMap>,
    /// Optional caller identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl UserRequest {
    /// Creates a request with no context and no user.
    #[must_use]
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            context: None,
            user_id: None,
        }
    }

    /// Sets the context mapping.
    #[must_use]
    pub fn with_context(mut self, context: ContextMap) -> Self {
        self.context = Some(context);
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context
            .get_or_insert_with(ContextMap::new)
            .insert(key.into(), value);
        self
    }

    /// Sets the user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Renders the context for inclusion in a task description.
    #[must_use]
    pub fn render_context(&self) -> String {
        match self.context {
            Some(ref ctx) if !ctx.is_empty() => ctx
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => "No additional context".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_context() {
        let request = UserRequest::new("help me");
        assert_eq!(request.render_context(), "No additional context");

        let request = UserRequest::new("help me").with_context(ContextMap::new());
        assert_eq!(request.render_context(), "No additional context");
    }

    #[test]
    fn test_render_context_is_ordered() {
        let request = UserRequest::new("help me")
            .with_context_entry("zone", serde_json::json!("EU"))
            .with_context_entry("budget", serde_json::json!(300));

        assert_eq!(request.render_context(), "budget: 300\nzone: \"EU\"");
    }

    #[test]
    fn test_serialize_skips_missing_fields() {
        let json = serde_json::to_value(UserRequest::new("x")).unwrap();
        assert_eq!(json, serde_json::json!({"intent": "x"}));
    }
}
