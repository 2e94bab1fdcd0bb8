//! Functional requirements analysis.

use super::{strings, AgentStage, StageInput, StageTemplate};
use crate::core::{RecordBody, RequirementsRecord, StageKind};

/// Confidence attached to reviewed requirements.
pub const SUCCESS_CONFIDENCE: f64 = 0.88;
/// Confidence attached to the requirements fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.6;

const CHECKLIST: &[&str] = &[
    "the objectives are SMART",
    "the needs are clear and measurable",
    "acceptance criteria are defined",
    "the plan is realistic",
    "risks are identified and mitigated",
];

/// Requirements stage template.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementsTemplate;

/// The requirements analysis stage.
pub type RequirementsStage = AgentStage<RequirementsTemplate>;

impl StageTemplate for RequirementsTemplate {
    fn kind(&self) -> StageKind {
        StageKind::Requirements
    }

    fn producer_task(&self, input: StageInput<'_>) -> String {
        format!(
            "Analyse the functional needs based on this intent analysis:\n{}\n\
             Develop detailed functional specifications including:\n\
             1. SMART objectives (specific, measurable, achievable, realistic, time-bound)\n\
             2. Detailed functional needs\n\
             3. Acceptance criteria\n\
             4. Constraints and identified risks\n\
             5. Preliminary schedule\n\
             6. Required resources\n\
             7. Success metrics\n",
            input.render()
        )
    }

    fn checklist(&self) -> &'static [&'static str] {
        CHECKLIST
    }

    fn success_record(&self, _input: StageInput<'_>, reviewed: String) -> RecordBody {
        RecordBody::Requirements(RequirementsRecord {
            requirements: reviewed,
            confidence: SUCCESS_CONFIDENCE,
            objectives: strings(&[
                "Define a personalised coaching plan",
                "Set measurable objectives",
                "Schedule regular follow-up",
            ]),
            acceptance_criteria: strings(&[
                "Coaching plan approved by the client",
                "SMART objectives defined",
                "Follow-up calendar established",
            ]),
            timeline: "4-6 weeks".to_string(),
            resources: strings(&["certified_coach", "tracking_tools", "communication_platform"]),
            risks: strings(&["client_availability", "unrealistic_objectives"]),
            success_metrics: strings(&["objectives_reached", "client_satisfaction", "measurable_progress"]),
        })
    }

    fn fallback_record(&self, input: StageInput<'_>) -> RecordBody {
        RecordBody::Requirements(RequirementsRecord {
            requirements: format!("Requirements analysis based on: {}", input.subject()),
            confidence: FALLBACK_CONFIDENCE,
            objectives: strings(&["Personalised coaching"]),
            acceptance_criteria: strings(&["Client satisfied"]),
            timeline: "To be defined".to_string(),
            resources: strings(&["coach"]),
            risks: strings(&["Not specified"]),
            success_metrics: strings(&["Client satisfaction"]),
        })
    }
}
