//! Technical solution design.

use super::{string_map, strings, AgentStage, StageInput, StageTemplate};
use crate::core::{DesignRecord, RecordBody, StageKind};

/// Confidence attached to a reviewed design.
pub const SUCCESS_CONFIDENCE: f64 = 0.92;
/// Confidence attached to the design fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.7;

const CHECKLIST: &[&str] = &[
    "the architecture is scalable and maintainable",
    "the chosen technologies fit the problem",
    "security is taken into account",
    "performance is optimised",
    "deployment is automated",
    "monitoring is complete",
];

/// Design stage template.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesignTemplate;

/// The technical design stage.
pub type DesignStage = AgentStage<DesignTemplate>;

impl StageTemplate for DesignTemplate {
    fn kind(&self) -> StageKind {
        StageKind::Design
    }

    fn producer_task(&self, input: StageInput<'_>) -> String {
        format!(
            "Design a technical solution based on these specifications:\n{}\n\
             Your design must cover:\n\
             1. Overall architecture (microservices, monolith...)\n\
             2. Recommended technology stack\n\
             3. API design and endpoints\n\
             4. Database and models\n\
             5. External integrations\n\
             6. Security and authentication\n\
             7. Performance and scalability\n\
             8. Monitoring and observability\n\
             9. Deployment and CI/CD\n\
             10. Technical effort estimate\n",
            input.render()
        )
    }

    fn checklist(&self) -> &'static [&'static str] {
        CHECKLIST
    }

    fn success_record(&self, _input: StageInput<'_>, reviewed: String) -> RecordBody {
        RecordBody::Design(DesignRecord {
            solution: reviewed,
            confidence: SUCCESS_CONFIDENCE,
            architecture: string_map(&[
                ("type", "microservices"),
                ("frontend", "Astro + TinaCMS + React Islands"),
                ("backend", "FastAPI + CrewAI + PayloadCMS"),
                ("database", "PostgreSQL + Qdrant"),
                ("infrastructure", "Kubernetes + Crossplane + ArgoCD"),
            ]),
            integrations: strings(&[
                "LiveKit (video)",
                "Stripe (payments)",
                "OAuth (calendars)",
                "Flowise (conversational AI)",
                "n8n (workflows)",
            ]),
            security: strings(&[
                "JWT authentication",
                "OAuth 2.0",
                "HTTPS/TLS",
                "Rate limiting",
                "Input validation",
            ]),
            performance: string_map(&[
                ("caching", "Redis"),
                ("cdn", "Cloudflare"),
                ("load_balancing", "Kubernetes Ingress"),
                ("monitoring", "Prometheus + Grafana"),
            ]),
            deployment: string_map(&[
                ("ci_cd", "GitHub Actions + ArgoCD"),
                ("containers", "Docker"),
                ("orchestration", "Kubernetes"),
                ("monitoring", "Backstage"),
            ]),
            effort_estimation: "8-12 weeks".to_string(),
        })
    }

    fn fallback_record(&self, input: StageInput<'_>) -> RecordBody {
        RecordBody::Design(DesignRecord {
            solution: format!("Technical design based on: {}", input.subject()),
            confidence: FALLBACK_CONFIDENCE,
            architecture: string_map(&[
                ("type", "monolithic"),
                ("frontend", "Astro"),
                ("backend", "FastAPI"),
                ("database", "PostgreSQL"),
            ]),
            integrations: strings(&["Basic"]),
            security: strings(&["Standard"]),
            performance: string_map(&[("caching", "Basic")]),
            deployment: string_map(&[("ci_cd", "Manual")]),
            effort_estimation: "To be defined".to_string(),
        })
    }
}
