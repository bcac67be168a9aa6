//! Agent registry and factory.
//!
//! Agents are built once at startup from a static table of constructors
//! keyed by id, then looked up per request.

use crate::agents::{ClinicalAgent, StandardAgent, StandardGraphAgent, TemplateAgent};
use crate::pipeline::{AgentDeps, PipelineAgent};
use medchat_core::agent::{Agent, AgentInfo};
use medchat_core::error::AgentError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Agent used when a request names none.
pub const DEFAULT_AGENT_ID: &str = "standard";

/// Built-in agent ids, in listing order.
pub const BUILTIN_AGENT_IDS: [&str; 4] = ["standard", "standard_graph", "clinical", "template"];

/// Builds one agent from the shared services.
pub type AgentConstructor = fn(AgentDeps) -> Arc<dyn Agent>;

fn standard(deps: AgentDeps) -> Arc<dyn Agent> {
    Arc::new(PipelineAgent::new(StandardAgent, deps))
}

fn standard_graph(deps: AgentDeps) -> Arc<dyn Agent> {
    Arc::new(PipelineAgent::new(StandardGraphAgent, deps))
}

fn clinical(deps: AgentDeps) -> Arc<dyn Agent> {
    Arc::new(PipelineAgent::new(ClinicalAgent, deps))
}

fn template(deps: AgentDeps) -> Arc<dyn Agent> {
    Arc::new(PipelineAgent::new(TemplateAgent, deps))
}

/// The constructor table for every built-in agent.
pub fn builtin_constructors() -> HashMap<&'static str, AgentConstructor> {
    HashMap::from([
        ("standard", standard as AgentConstructor),
        ("standard_graph", standard_graph as AgentConstructor),
        ("clinical", clinical as AgentConstructor),
        ("template", template as AgentConstructor),
    ])
}

/// Create a built-in agent by id.
pub fn create_agent(agent_id: &str, deps: AgentDeps) -> Result<Arc<dyn Agent>, AgentError> {
    match builtin_constructors().get(agent_id) {
        Some(constructor) => Ok(constructor(deps)),
        None => {
            error!(agent_id, "Unknown agent ID");
            Err(AgentError::NotFound(agent_id.to_string()))
        }
    }
}

/// Registered agents, in registration order.
pub struct AgentRegistry {
    agents: Vec<Arc<dyn Agent>>,
    default_agent_id: String,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            default_agent_id: DEFAULT_AGENT_ID.to_string(),
        }
    }

    /// A registry holding every built-in agent.
    pub fn with_builtins(deps: AgentDeps) -> Self {
        let mut registry = Self::new();
        for id in BUILTIN_AGENT_IDS {
            match create_agent(id, deps.clone()) {
                Ok(agent) => {
                    registry.register(agent);
                }
                Err(e) => error!(agent_id = id, error = %e, "Failed to build agent"),
            }
        }
        registry
    }

    /// Register an agent. A duplicate id is skipped with a warning and
    /// `false` is returned.
    pub fn register(&mut self, agent: Arc<dyn Agent>) -> bool {
        let id = agent.id().to_string();
        if self.is_registered(&id) {
            warn!(agent_id = %id, "Agent is already registered, skipping registration");
            return false;
        }
        self.agents.push(agent);
        info!(agent_id = %id, "Registered agent");
        true
    }

    pub fn unregister(&mut self, agent_id: &str) -> Result<(), AgentError> {
        let Some(index) = self.agents.iter().position(|a| a.id() == agent_id) else {
            warn!(agent_id, "Attempted to unregister unknown agent");
            return Err(AgentError::NotFound(agent_id.to_string()));
        };
        self.agents.remove(index);
        info!(agent_id, "Unregistered agent");
        Ok(())
    }

    pub fn get(&self, agent_id: &str) -> Result<Arc<dyn Agent>, AgentError> {
        self.agents
            .iter()
            .find(|a| a.id() == agent_id)
            .cloned()
            .ok_or_else(|| AgentError::NotFound(agent_id.to_string()))
    }

    /// The named agent, or the default one when no id is given.
    pub fn resolve(&self, agent_id: Option<&str>) -> Result<Arc<dyn Agent>, AgentError> {
        let id = agent_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.default_agent_id);
        debug!(agent_id = id, "Resolving agent");
        self.get(id)
    }

    pub fn list_agents(&self) -> Vec<AgentInfo> {
        self.agents.iter().map(|a| a.info()).collect()
    }

    pub fn is_registered(&self, agent_id: &str) -> bool {
        self.agents.iter().any(|a| a.id() == agent_id)
    }

    pub fn default_agent_id(&self) -> &str {
        &self.default_agent_id
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
