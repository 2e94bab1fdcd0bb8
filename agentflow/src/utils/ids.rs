//! Run identifiers and request digests.

use crate::core::UserRequest;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generates a run id of the form `wf_{user}_{uuid}`, using `anonymous`
/// when no user is known.
#[must_use]
pub fn generate_run_id(user_id: Option<&str>) -> String {
    let user = user_id.filter(|u| !u.is_empty()).unwrap_or("anonymous");
    format!("wf_{user}_{}", Uuid::new_v4().simple())
}

/// SHA-256 hex digest of the request's intent and context.
///
/// The user id is excluded, so identical requests from different callers
/// share a digest.
#[must_use]
pub fn input_digest(request: &UserRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.intent.as_bytes());
    hasher.update([0u8]);
    if let Some(ref context) = request.context {
        for (key, value) in context {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.to_string().as_bytes());
            hasher.update([0u8]);
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_prefix() {
        assert!(generate_run_id(Some("u42")).starts_with("wf_u42_"));
        assert!(generate_run_id(None).starts_with("wf_anonymous_"));
        assert!(generate_run_id(Some("")).starts_with("wf_anonymous_"));
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(generate_run_id(None), generate_run_id(None));
    }

    #[test]
    fn test_digest_ignores_user() {
        let a = UserRequest::new("coach me").with_user_id("alice");
        let b = UserRequest::new("coach me").with_user_id("bob");
        assert_eq!(input_digest(&a), input_digest(&b));
        assert_eq!(input_digest(&a).len(), 64);
    }

    #[test]
    fn test_digest_covers_context() {
        let plain = UserRequest::new("coach me");
        let with_ctx = UserRequest::new("coach me").with_context_entry("goal", serde_json::json!("run"));
        assert_ne!(input_digest(&plain), input_digest(&with_ctx));
    }
}
