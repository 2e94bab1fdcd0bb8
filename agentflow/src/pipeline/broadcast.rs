//! Single-task requests run outside the four-stage sequence.

use crate::agents::{AgentId, AgentRole, AgentRoster};
use crate::core::ContextMap;
use crate::gateway::{require_text, CompletionGateway};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// A task addressed to one or two roles of the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum BroadcastTask {
    /// Coordinate a whole workflow, then have it checked against OKRs.
    OrchestrateWorkflow {
        /// The user intent.
        intent: String,
        /// Optional context.
        #[serde(default)]
        context: Option<ContextMap>,
    },
    /// Propose optimisations from agent metrics.
    OptimizeAgents {
        /// Agent metrics.
        metrics: serde_json::Value,
    },
    /// Resolve a request that spans several agents.
    ComplexRequest {
        /// The request.
        request: serde_json::Value,
    },
    /// Report on overall system health.
    SystemHealth,
    /// Assemble a specialised agent team.
    AgentTeam {
        /// Team configuration.
        config: serde_json::Value,
    },
    /// Turn feedback into a learning plan.
    ContinuousLearning {
        /// Feedback data.
        feedback: serde_json::Value,
    },
    /// Ask an agent to improve its previous output from feedback.
    Improve {
        /// The agent to improve.
        agent: AgentId,
        /// Feedback data.
        feedback: serde_json::Value,
    },
    /// Turn requirements into a project plan.
    ProjectPlan {
        /// Requirements.
        requirements: serde_json::Value,
    },
    /// Review a project's progress.
    MonitorProgress {
        /// Project id.
        project_id: String,
        /// Current status.
        status: serde_json::Value,
    },
    /// Expand a solution into technical specifications.
    TechnicalSpecs {
        /// The solution.
        solution: serde_json::Value,
    },
    /// Review code quality.
    CodeReview {
        /// Review material.
        review: serde_json::Value,
    },
    /// Propose performance optimisations.
    OptimizePerformance {
        /// Performance data.
        data: serde_json::Value,
    },
    /// Carry out a deployment.
    ExecuteDeployment {
        /// Deployment configuration.
        config: serde_json::Value,
    },
    /// Watch a running deployment.
    MonitorDeployment {
        /// Deployment id.
        deployment_id: String,
    },
    /// Write release notes.
    ReleaseNotes {
        /// Release data.
        data: serde_json::Value,
    },
    /// Respond to a deployment incident.
    HandleIncident {
        /// Incident data.
        incident: serde_json::Value,
    },
}

impl BroadcastTask {
    /// Short task name for logs and events.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrchestrateWorkflow { .. } => "orchestrate_workflow",
            Self::OptimizeAgents { .. } => "optimize_agents",
            Self::ComplexRequest { .. } => "complex_request",
            Self::SystemHealth => "system_health",
            Self::AgentTeam { .. } => "agent_team",
            Self::ContinuousLearning { .. } => "continuous_learning",
            Self::Improve { .. } => "improve",
            Self::ProjectPlan { .. } => "project_plan",
            Self::MonitorProgress { .. } => "monitor_progress",
            Self::TechnicalSpecs { .. } => "technical_specs",
            Self::CodeReview { .. } => "code_review",
            Self::OptimizePerformance { .. } => "optimize_performance",
            Self::ExecuteDeployment { .. } => "execute_deployment",
            Self::MonitorDeployment { .. } => "monitor_deployment",
            Self::ReleaseNotes { .. } => "release_notes",
            Self::HandleIncident { .. } => "handle_incident",
        }
    }

    /// Key under which the output is reported.
    #[must_use]
    pub fn output_key(&self) -> &'static str {
        match self {
            Self::OrchestrateWorkflow { .. } => "orchestrated_workflow",
            Self::OptimizeAgents { .. } | Self::OptimizePerformance { .. } => "optimization_plan",
            Self::ComplexRequest { .. } => "complex_solution",
            Self::SystemHealth => "system_health_report",
            Self::AgentTeam { .. } => "agent_team",
            Self::ContinuousLearning { .. } => "learning_plan",
            Self::Improve { .. } => "improved_analysis",
            Self::ProjectPlan { .. } => "project_plan",
            Self::MonitorProgress { .. } | Self::MonitorDeployment { .. } => "monitoring_report",
            Self::TechnicalSpecs { .. } => "technical_specs",
            Self::CodeReview { .. } => "code_review_report",
            Self::ExecuteDeployment { .. } => "deployment_report",
            Self::ReleaseNotes { .. } => "release_notes",
            Self::HandleIncident { .. } => "incident_response",
        }
    }

    /// Key under which the success flag is reported.
    #[must_use]
    pub fn flag_key(&self) -> &'static str {
        match self {
            Self::OrchestrateWorkflow { .. } => "workflow_optimized",
            Self::OptimizeAgents { .. } | Self::OptimizePerformance { .. } => "performance_improvements",
            Self::ComplexRequest { .. } => "request_resolved",
            Self::SystemHealth => "system_healthy",
            Self::AgentTeam { .. } => "team_configured",
            Self::ContinuousLearning { .. } => "continuous_improvement",
            Self::Improve { .. } => "improvement_applied",
            Self::ProjectPlan { .. } => "planning_complete",
            Self::MonitorProgress { .. } => "adjustments_needed",
            Self::TechnicalSpecs { .. } => "specs_complete",
            Self::CodeReview { .. } => "improvements_suggested",
            Self::ExecuteDeployment { .. } => "deployment_successful",
            Self::MonitorDeployment { .. } => "deployment_healthy",
            Self::ReleaseNotes { .. } => "notes_complete",
            Self::HandleIncident { .. } => "incident_handled",
        }
    }

    /// Roles that handle the task, in call order.
    #[must_use]
    pub fn roles<'r>(&self, roster: &'r AgentRoster) -> Vec<&'r AgentRole> {
        match self {
            Self::OrchestrateWorkflow { .. } => vec![roster.orchestrator(), roster.okr_monitor()],
            Self::OptimizeAgents { .. }
            | Self::ComplexRequest { .. }
            | Self::AgentTeam { .. }
            | Self::ContinuousLearning { .. } => vec![roster.orchestrator()],
            Self::SystemHealth => vec![roster.okr_monitor()],
            Self::Improve { agent, .. } => vec![roster.producer(*agent)],
            Self::ProjectPlan { .. } => vec![roster.producer(AgentId::Project)],
            Self::MonitorProgress { .. } => vec![roster.validator(AgentId::Project)],
            Self::TechnicalSpecs { .. } | Self::OptimizePerformance { .. } => {
                vec![roster.producer(AgentId::Technical)]
            }
            Self::CodeReview { .. } => vec![roster.validator(AgentId::Technical)],
            Self::ExecuteDeployment { .. } | Self::ReleaseNotes { .. } | Self::HandleIncident { .. } => {
                vec![roster.producer(AgentId::Release)]
            }
            Self::MonitorDeployment { .. } => vec![roster.validator(AgentId::Release)],
        }
    }

    /// Task text for the first role.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::OrchestrateWorkflow { intent, context } => {
                let context = context
                    .as_ref()
                    .filter(|c| !c.is_empty())
                    .map_or_else(|| "No additional context".to_string(), |c| render_json(&serde_json::json!(c)));
                format!(
                    "Orchestrate the complete workflow for this user intent:\n\"{intent}\"\n\n\
                     Context: {context}\n\n\
                     Coordinate intent analysis, requirements analysis, technical design and \
                     delivery preparation. Make sure each step is sound and the results are consistent."
                )
            }
            Self::OptimizeAgents { metrics } => titled(
                "Analyse these agent metrics and propose optimisations",
                metrics,
                &["Under-performing agents", "Bottlenecks", "Possible optimisations", "Configuration adjustments", "Prompt improvements"],
            ),
            Self::ComplexRequest { request } => titled(
                "Handle this complex request that needs several agents",
                request,
                &["Mobilise the right skills", "Optimise the interactions", "Keep results consistent", "Maintain quality"],
            ),
            Self::SystemHealth => "Monitor the overall health of the agent system. Check:\n\
                 1. Performance of each agent\n\
                 2. Quality of interactions\n\
                 3. OKR attainment\n\
                 4. Potential problems\n\
                 5. Improvement recommendations\n"
                .to_string(),
            Self::AgentTeam { config } => titled(
                "Create a specialised agent team from this configuration",
                config,
                &["Required agents", "Roles and responsibilities", "Interactions between agents", "Optimised workflow", "Success metrics"],
            ),
            Self::ContinuousLearning { feedback } => titled(
                "Analyse this feedback and set up continuous learning",
                feedback,
                &["Improvement patterns", "Behaviour adjustments", "Prompt optimisations", "New skills to develop", "Workflow adaptation"],
            ),
            Self::Improve { agent, feedback } => format!(
                "Improve your previous {} output based on this feedback:\n{}\n\n\
                 Identify what to improve and propose an optimised version.",
                agent.stage(),
                render_json(feedback)
            ),
            Self::ProjectPlan { requirements } => titled(
                "Create a detailed project plan from these specifications",
                requirements,
                &["Phases and milestones", "Task breakdown", "Effort estimates", "Risk management", "Communication and reporting", "Quality and validation"],
            ),
            Self::MonitorProgress { project_id, status } => titled(
                &format!("Analyse the progress of project {project_id}"),
                status,
                &["Schedule deviations", "Emerging risks", "Corrective actions", "Plan adjustments"],
            ),
            Self::TechnicalSpecs { solution } => titled(
                "Write detailed technical specifications for this solution",
                solution,
                &["Architecture diagrams", "API specifications", "Data models", "Database schemas", "Infrastructure configuration", "Tests and quality", "Technical documentation"],
            ),
            Self::CodeReview { review } => titled(
                "Review the code described below",
                review,
                &["Code quality", "Good practices", "Performance", "Security", "Maintainability", "Tests", "Documentation"],
            ),
            Self::OptimizePerformance { data } => titled(
                "Analyse this performance data and propose optimisations",
                data,
                &["Bottlenecks", "Possible optimisations", "Settings to adjust", "Monitoring to improve", "Load tests to run"],
            ),
            Self::ExecuteDeployment { config } => titled(
                "Carry out the deployment described by this configuration",
                config,
                &["Pre-deployment validation", "Staging deployment", "Validation tests", "Production deployment", "Post-deployment monitoring", "Final validation"],
            ),
            Self::MonitorDeployment { deployment_id } => format!(
                "Monitor deployment {deployment_id} and identify:\n\
                 1. Performance metrics\n\
                 2. Errors and alerts\n\
                 3. User behaviour\n\
                 4. Potential problems\n\
                 5. Corrective actions\n"
            ),
            Self::ReleaseNotes { data } => titled(
                "Write release notes from this data",
                data,
                &["Summary of changes", "New features", "Bug fixes", "Performance improvements", "Upgrade instructions", "Known issues", "Support and contact"],
            ),
            Self::HandleIncident { incident } => titled(
                "Handle this deployment incident",
                incident,
                &["Incident analysis", "Impact assessment", "Immediate actions", "Stakeholder communication", "Resolution plan", "Future prevention"],
            ),
        }
    }

    /// Task text for a follow-up role, embedding the previous role's output.
    #[must_use]
    pub fn follow_up(&self, previous: &str) -> String {
        match self {
            Self::OrchestrateWorkflow { .. } => format!(
                "Validate the orchestrated workflow below and check the OKRs:\n\
                 - Quality of the analyses\n\
                 - Consistency of the results\n\
                 - Agent performance\n\
                 - Objective attainment\n\n\
                 Propose improvements where needed.\n\n\
                 Workflow:\n{previous}"
            ),
            _ => format!("Review and improve the output below.\n\n{previous}"),
        }
    }
}

fn render_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn titled(title: &str, payload: &serde_json::Value, points: &[&str]) -> String {
    let mut out = format!("{title}:\n{}\n\nCover:\n", render_json(payload));
    for (i, point) in points.iter().enumerate() {
        out.push_str(&format!("{}. {point}\n", i + 1));
    }
    out
}

/// What a broadcast task produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastOutcome {
    /// Task name.
    pub task: String,
    /// Key the output is reported under.
    pub output_key: String,
    /// Key the success flag is reported under.
    pub flag_key: String,
    /// The last role's reply, or the error text.
    pub output: String,
    /// Whether every call succeeded.
    pub success: bool,
    /// The gateway error, if one occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BroadcastOutcome {
    /// Converts to `{output_key: output, flag_key: success}`.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert(self.output_key.clone(), serde_json::json!(self.output));
        map.insert(self.flag_key.clone(), serde_json::json!(self.success));
        if let Some(ref error) = self.error {
            map.insert("error".to_string(), serde_json::json!(error));
        }
        map
    }
}

/// Runs a task through its roles. Gateway errors are reported in the
/// outcome, never raised.
pub async fn run_broadcast(
    gateway: &dyn CompletionGateway,
    roster: &AgentRoster,
    task: &BroadcastTask,
) -> BroadcastOutcome {
    let mut text = task.description();
    let mut output = String::new();
    let mut failure = None;

    for (i, role) in task.roles(roster).into_iter().enumerate() {
        if i > 0 {
            text = task.follow_up(&output);
        }
        match gateway.complete(role, &text).await.and_then(require_text) {
            Ok(reply) => output = reply,
            Err(err) => {
                warn!(task = task.name(), role = %role.name, error = %err, "Broadcast task failed");
                failure = Some(err.to_string());
                break;
            }
        }
    }

    let outcome = BroadcastOutcome {
        task: task.name().to_string(),
        output_key: task.output_key().to_string(),
        flag_key: task.flag_key().to_string(),
        output: failure.clone().unwrap_or(output),
        success: failure.is_none(),
        error: failure,
    };
    info!(task = task.name(), success = outcome.success, "Broadcast task finished");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GatewayError;
    use crate::gateway::MockCompletionGateway;
    use mockall::Sequence;

    #[tokio::test]
    async fn test_orchestrate_runs_two_roles() {
        let mut mock = MockCompletionGateway::new();
        let mut seq = Sequence::new();
        mock.expect_complete()
            .withf(|role, task| role.name == "Workflow Orchestrator" && task.contains("\"launch a course\""))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("workflow draft".to_string()));
        mock.expect_complete()
            .withf(|role, task| role.name == "OKR Monitor" && task.ends_with("workflow draft"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok("validated workflow".to_string()));

        let task = BroadcastTask::OrchestrateWorkflow {
            intent: "launch a course".to_string(),
            context: None,
        };
        let outcome = run_broadcast(&mock, &AgentRoster::new(), &task).await;

        assert!(outcome.success);
        assert_eq!(outcome.output, "validated workflow");
        let dict = outcome.to_dict();
        assert_eq!(dict["orchestrated_workflow"], "validated workflow");
        assert_eq!(dict["workflow_optimized"], true);
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let mut mock = MockCompletionGateway::new();
        mock.expect_complete()
            .times(1)
            .returning(|_, _| Err(GatewayError::RateLimited { retry_after: Some(7) }));

        let outcome = run_broadcast(&mock, &AgentRoster::new(), &BroadcastTask::SystemHealth).await;

        assert!(!outcome.success);
        assert!(outcome.output.contains("retry after 7s"));
        let dict = outcome.to_dict();
        assert_eq!(dict["system_healthy"], false);
        assert!(dict.contains_key("error"));
    }

    #[test]
    fn test_role_routing() {
        let roster = AgentRoster::new();
        let names = |task: BroadcastTask| -> Vec<String> {
            task.roles(&roster).iter().map(|r| r.name.clone()).collect()
        };

        assert_eq!(names(BroadcastTask::SystemHealth), vec!["OKR Monitor"]);
        assert_eq!(
            names(BroadcastTask::CodeReview { review: serde_json::json!({}) }),
            vec!["Technical Supervisor"]
        );
        assert_eq!(
            names(BroadcastTask::MonitorDeployment { deployment_id: "d1".to_string() }),
            vec!["Quality Supervisor"]
        );
        assert_eq!(
            names(BroadcastTask::Improve { agent: AgentId::Project, feedback: serde_json::json!("x") }),
            vec!["Requirements Analyst"]
        );
    }

    #[test]
    fn test_keys() {
        let task = BroadcastTask::MonitorProgress {
            project_id: "p-9".to_string(),
            status: serde_json::json!({"done": 3}),
        };
        assert_eq!(task.output_key(), "monitoring_report");
        assert_eq!(task.flag_key(), "adjustments_needed");
        assert!(task.description().contains("project p-9"));
        assert!(task.description().contains("\"done\": 3"));
    }

    #[test]
    fn test_task_deserializes_from_tag() {
        let task: BroadcastTask =
            serde_json::from_str(r#"{"task": "release_notes", "data": {"version": "1.2"}}"#).unwrap();
        assert_eq!(task.output_key(), "release_notes");
        assert_eq!(task.flag_key(), "notes_complete");
    }
}
