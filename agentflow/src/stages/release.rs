//! Release and delivery planning.

use super::{string_map, strings, AgentStage, StageInput, StageTemplate};
use crate::core::{
    CommunicationPlan, DeploymentStrategy, RecordBody, ReleaseRecord, RollbackPolicy, StageKind,
};

/// Confidence attached to a reviewed delivery plan.
pub const SUCCESS_CONFIDENCE: f64 = 0.90;
/// Confidence attached to the release fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.6;

const CHECKLIST: &[&str] = &[
    "the deployment strategy is appropriate",
    "the tests are complete",
    "monitoring is sufficient",
    "rollback is possible",
    "documentation is complete",
    "the communication plan is clear",
];

/// Release stage template.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseTemplate;

/// The release planning stage.
pub type ReleaseStage = AgentStage<ReleaseTemplate>;

impl StageTemplate for ReleaseTemplate {
    fn kind(&self) -> StageKind {
        StageKind::Release
    }

    fn producer_task(&self, input: StageInput<'_>) -> String {
        format!(
            "Prepare a delivery plan based on this technical solution:\n{}\n\
             Your plan must include:\n\
             1. Deployment strategy (blue-green, canary, rolling)\n\
             2. Environments (dev, staging, production)\n\
             3. Detailed CI/CD pipeline\n\
             4. Automated tests (unit, integration, e2e)\n\
             5. Monitoring and alerting\n\
             6. Rollback strategy\n\
             7. User documentation\n\
             8. Training and support\n\
             9. Success metrics\n\
             10. Communication plan\n",
            input.render()
        )
    }

    fn checklist(&self) -> &'static [&'static str] {
        CHECKLIST
    }

    fn success_record(&self, _input: StageInput<'_>, reviewed: String) -> RecordBody {
        RecordBody::Release(ReleaseRecord {
            delivery_plan: reviewed,
            confidence: SUCCESS_CONFIDENCE,
            deployment_strategy: DeploymentStrategy {
                kind: "blue-green".to_string(),
                environments: strings(&["dev", "staging", "production"]),
                automation: Some("GitHub Actions + ArgoCD".to_string()),
            },
            testing: string_map(&[
                ("unit_tests", "Jest + Pytest"),
                ("integration_tests", "Postman + Newman"),
                ("e2e_tests", "Playwright"),
                ("performance_tests", "k6"),
                ("security_tests", "OWASP ZAP"),
            ]),
            monitoring: string_map(&[
                ("metrics", "Prometheus + Grafana"),
                ("logging", "ELK Stack"),
                ("alerting", "PagerDuty"),
                ("tracing", "Jaeger"),
            ]),
            rollback: RollbackPolicy {
                strategy: "automatic".to_string(),
                triggers: strings(&["error_rate > 5%", "response_time > 2s"]),
                timeout: Some("5 minutes".to_string()),
            },
            documentation: strings(&[
                "User guide",
                "API documentation",
                "Deployment guide",
                "Operations runbook",
            ]),
            communication: CommunicationPlan {
                stakeholders: strings(&["dev_team", "coaches", "clients"]),
                channels: strings(&["email", "slack", "dashboard"]),
                frequency: Some("real-time".to_string()),
            },
            success_metrics: strings(&[
                "uptime > 99.9%",
                "response_time < 500ms",
                "error_rate < 1%",
                "user_satisfaction > 4.5/5",
            ]),
            timeline: "2-3 weeks".to_string(),
        })
    }

    fn fallback_record(&self, input: StageInput<'_>) -> RecordBody {
        RecordBody::Release(ReleaseRecord {
            delivery_plan: format!("Delivery plan based on: {}", input.subject()),
            confidence: FALLBACK_CONFIDENCE,
            deployment_strategy: DeploymentStrategy {
                kind: "manual".to_string(),
                environments: Vec::new(),
                automation: None,
            },
            testing: string_map(&[("basic", "manual tests")]),
            monitoring: string_map(&[("basic", "logs")]),
            rollback: RollbackPolicy {
                strategy: "manual".to_string(),
                triggers: Vec::new(),
                timeout: None,
            },
            documentation: strings(&["Basic guide"]),
            communication: CommunicationPlan {
                stakeholders: Vec::new(),
                channels: strings(&["email"]),
                frequency: None,
            },
            success_metrics: strings(&["functional"]),
            timeline: "To be defined".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StageRecord, UserRequest};

    #[test]
    fn test_success_record() {
        let request = UserRequest::new("x");
        let record = StageRecord::produced(
            ReleaseTemplate.success_record(StageInput::Request(&request), "plan".to_string()),
        );

        assert_eq!(record.payload(), "plan");
        assert_eq!(record.category(), Some("blue-green"));
        assert_eq!(record.tags().get("rollback").map(String::as_str), Some("automatic"));
    }

    #[test]
    fn test_fallback_record() {
        let request = UserRequest::new("ship it");
        let record = StageRecord::fallback(
            ReleaseTemplate.fallback_record(StageInput::Request(&request)),
            "rate limited",
        );

        assert_eq!(record.payload(), "Delivery plan based on: ship it");
        assert_eq!(record.category(), Some("manual"));
        assert!((record.confidence() - FALLBACK_CONFIDENCE).abs() < f64::EPSILON);
        assert!(record.confidence() < SUCCESS_CONFIDENCE);
    }
}
