//! Agent role descriptors and the fixed roster.

use super::AgentId;
use serde::{Deserialize, Serialize};

/// What a role does within its agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleDuty {
    /// Drafts the stage output.
    Producer,
    /// Reviews the producer's draft against a checklist.
    Validator,
}

/// A role the completion gateway is asked to play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRole {
    /// Display name, also used to address the role in logs and test doubles.
    pub name: String,
    /// What the role is trying to achieve.
    pub goal: String,
    /// Persona description.
    pub backstory: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Producer or validator.
    pub duty: RoleDuty,
}

impl AgentRole {
    /// Creates a producer role with the default temperature.
    #[must_use]
    pub fn new(name: impl Into<String>, goal: impl Into<String>, backstory: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            temperature: 0.1,
            duty: RoleDuty::Producer,
        }
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Marks the role as a validator.
    #[must_use]
    pub fn validator(mut self) -> Self {
        self.duty = RoleDuty::Validator;
        self
    }

    /// Renders the role as a system prompt.
    #[must_use]
    pub fn system_prompt(&self) -> String {
        format!(
            "You are the {}.\nGoal: {}\n{}",
            self.name, self.goal, self.backstory
        )
    }
}

/// The producer/validator pair behind one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePair {
    /// Drafting role.
    pub producer: AgentRole,
    /// Reviewing role.
    pub validator: AgentRole,
}

impl RolePair {
    fn with_temperature(mut self, temperature: f32) -> Self {
        self.producer.temperature = temperature;
        self.validator.temperature = temperature;
        self
    }
}

/// Every role known to the platform: one pair per pipeline agent plus the
/// crew-level coordinator pair used by broadcast tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRoster {
    intent: RolePair,
    project: RolePair,
    technical: RolePair,
    release: RolePair,
    crew: RolePair,
}

impl Default for AgentRoster {
    fn default() -> Self {
        Self {
            intent: RolePair {
                producer: AgentRole::new(
                    "Intent Analyst",
                    "Analyse and understand user intents to route them to the right services",
                    "You are an expert in behavioural analysis and in understanding user needs, \
                     with particular expertise in coaching and personalised support.",
                ),
                validator: AgentRole::new(
                    "Intent Supervisor",
                    "Validate and improve intent analyses to ensure their quality",
                    "You are an experienced supervisor who validates intent analyses. \
                     You make sure user needs are correctly identified and prioritised.",
                )
                .validator(),
            }
            .with_temperature(0.1),
            project: RolePair {
                producer: AgentRole::new(
                    "Requirements Analyst",
                    "Analyse user needs and define functional specifications",
                    "You are an experienced functional project manager who turns user intents \
                     into clear, measurable specifications for a coaching platform.",
                ),
                validator: AgentRole::new(
                    "Specifications Supervisor",
                    "Validate and optimise functional specifications",
                    "You are a senior supervisor who checks that needs are understood, measurable \
                     and achievable. You are fluent in agile methods and project management.",
                )
                .validator(),
            }
            .with_temperature(0.2),
            technical: RolePair {
                producer: AgentRole::new(
                    "Technical Architect",
                    "Design robust and scalable technical solutions",
                    "You are an experienced lead developer specialised in solution architecture. \
                     You design scalable, maintainable solutions for the coaching platform.",
                ),
                validator: AgentRole::new(
                    "Technical Supervisor",
                    "Validate and optimise technical architectures",
                    "You are a senior architect who validates technical designs for robustness, \
                     performance and evolvability, with DevOps and cloud-native expertise.",
                )
                .validator(),
            }
            .with_temperature(0.3),
            release: RolePair {
                producer: AgentRole::new(
                    "Release Coordinator",
                    "Prepare and coordinate deployments safely and reliably",
                    "You are an experienced release manager specialised in continuous delivery, \
                     CI/CD and environment management.",
                ),
                validator: AgentRole::new(
                    "Quality Supervisor",
                    "Validate deliverable quality before deployment",
                    "You are a quality assurance expert who validates deliverables, automated \
                     tests and deployment checks.",
                )
                .validator(),
            }
            .with_temperature(0.2),
            crew: RolePair {
                producer: AgentRole::new(
                    "Workflow Orchestrator",
                    "Coordinate every agent to optimise the workflow",
                    "You are the main orchestrator of the platform. You coordinate the specialised \
                     agents and keep an overview of every process and interaction.",
                ),
                validator: AgentRole::new(
                    "OKR Monitor",
                    "Monitor and validate the objectives and key results of each agent",
                    "You track the OKRs of every agent and validate results against quality and \
                     performance standards.",
                )
                .validator(),
            }
            .with_temperature(0.1),
        }
    }
}

impl AgentRoster {
    /// Creates the standard roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the sampling temperature of one agent's roles.
    #[must_use]
    pub fn with_temperature(mut self, agent: AgentId, temperature: f32) -> Self {
        let pair = self.pair_mut(agent);
        pair.producer.temperature = temperature;
        pair.validator.temperature = temperature;
        self
    }

    /// The role pair behind a pipeline agent.
    #[must_use]
    pub fn pair(&self, agent: AgentId) -> &RolePair {
        match agent {
            AgentId::Intent => &self.intent,
            AgentId::Project => &self.project,
            AgentId::Technical => &self.technical,
            AgentId::Release => &self.release,
        }
    }

    fn pair_mut(&mut self, agent: AgentId) -> &mut RolePair {
        match agent {
            AgentId::Intent => &mut self.intent,
            AgentId::Project => &mut self.project,
            AgentId::Technical => &mut self.technical,
            AgentId::Release => &mut self.release,
        }
    }

    /// The drafting role of an agent.
    #[must_use]
    pub fn producer(&self, agent: AgentId) -> &AgentRole {
        &self.pair(agent).producer
    }

    /// The reviewing role of an agent.
    #[must_use]
    pub fn validator(&self, agent: AgentId) -> &AgentRole {
        &self.pair(agent).validator
    }

    /// The crew-level coordinator.
    #[must_use]
    pub fn orchestrator(&self) -> &AgentRole {
        &self.crew.producer
    }

    /// The crew-level OKR monitor.
    #[must_use]
    pub fn okr_monitor(&self) -> &AgentRole {
        &self.crew.validator
    }
}
