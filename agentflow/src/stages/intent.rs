//! Intent classification.

use super::{strings, AgentStage, StageInput, StageTemplate};
use crate::core::{IntentRecord, Priority, RecordBody, StageKind};

/// Confidence attached to a reviewed intent analysis.
pub const SUCCESS_CONFIDENCE: f64 = 0.85;
/// Confidence attached to the intent fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

const CHECKLIST: &[&str] = &[
    "the categorisation is appropriate",
    "the needs are correctly identified",
    "the recommendations are relevant",
    "the confidence score is justified",
];

/// Intent stage template.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentTemplate;

/// The intent classification stage.
pub type IntentStage = AgentStage<IntentTemplate>;

impl StageTemplate for IntentTemplate {
    fn kind(&self) -> StageKind {
        StageKind::Intent
    }

    fn producer_task(&self, input: StageInput<'_>) -> String {
        let (intent, context) = match input {
            StageInput::Request(request) => (request.intent.clone(), request.render_context()),
            StageInput::Record(record) => (record.payload().to_string(), record.render()),
        };
        format!(
            "Analyse the following user intent:\n\"{intent}\"\n\n\
             Context provided: {context}\n\n\
             Your analysis must include:\n\
             1. Categorisation of the intent (coaching, training, consultation...)\n\
             2. Urgency and priority level\n\
             3. Identified needs\n\
             4. Recommended actions\n\
             5. Confidence score (0-1)\n"
        )
    }

    fn checklist(&self) -> &'static [&'static str] {
        CHECKLIST
    }

    fn success_record(&self, _input: StageInput<'_>, reviewed: String) -> RecordBody {
        RecordBody::Intent(IntentRecord {
            analysis: reviewed,
            confidence: SUCCESS_CONFIDENCE,
            category: "coaching_request".to_string(),
            priority: Priority::Medium,
            needs: strings(&["personalised_support", "clear_objectives"]),
            recommendations: strings(&["discovery_session", "needs_assessment"]),
        })
    }

    fn fallback_record(&self, input: StageInput<'_>) -> RecordBody {
        RecordBody::Intent(IntentRecord {
            analysis: format!("Intent analysis: {}", input.subject()),
            confidence: FALLBACK_CONFIDENCE,
            category: "unknown".to_string(),
            priority: Priority::Low,
            needs: Vec::new(),
            recommendations: strings(&["human_contact"]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UserRequest;

    #[test]
    fn test_fallback_below_success() {
        let request = UserRequest::new("x");
        let input = StageInput::Request(&request);
        let fallback = IntentTemplate.fallback_record(input);
        let success = IntentTemplate.success_record(input, "ok".to_string());
        assert!(fallback.confidence() < success.confidence());
    }

    #[test]
    fn test_fallback_interpolates_intent() {
        let request = UserRequest::new("test");
        let RecordBody::Intent(body) = IntentTemplate.fallback_record(StageInput::Request(&request)) else {
            panic!("expected an intent body");
        };

        assert_eq!(body.analysis, "Intent analysis: test");
        assert_eq!(body.category, "unknown");
        assert_eq!(body.priority, Priority::Low);
        assert!(body.needs.is_empty());
        assert_eq!(body.recommendations, vec!["human_contact".to_string()]);
    }

    #[test]
    fn test_success_uses_reviewed_text() {
        let request = UserRequest::new("I want personalized coaching");
        let body = IntentTemplate.success_record(StageInput::Request(&request), "reviewed".to_string());

        assert_eq!(body.payload(), "reviewed");
        assert!((body.confidence() - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_producer_task_embeds_context() {
        let request = UserRequest::new("book a session").with_context_entry("tz", serde_json::json!("CET"));
        let task = IntentTemplate.producer_task(StageInput::Request(&request));

        assert!(task.contains("\"book a session\""));
        assert!(task.contains("tz: \"CET\""));

        let bare = IntentTemplate.producer_task(StageInput::Request(&UserRequest::new("x")));
        assert!(bare.contains("No additional context"));
    }
}
