//! Chat agents and the medical chat service.
//!
//! An agent chat request flows through one pipeline:
//!
//! 1. **Validate** the turn
//! 2. **Resolve** the LLM provider
//! 3. **Gather context** from memory via the [`ContextAggregator`], plus RAG documents
//! 4. **Build the prompt** from the agent's template
//! 5. **Call the LLM**
//! 6. **Store** the turn back into memory (failures are logged and ignored)
//! 7. **Return** the reply with per-type memory usage
//!
//! Agents differ only in their prompt template and the data sources they
//! consult. The [`medical`] module is a separate, memory-free chat path over
//! a static knowledge base.

pub mod agents;
pub mod context;
pub mod medical;
pub mod pipeline;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use agents::{ClinicalAgent, StandardAgent, StandardGraphAgent, TemplateAgent};
pub use context::{AggregatedContext, ContextAggregator, ContextSection};
pub use medical::{Language, MedicalChatRequest, MedicalChatService, MedicalHealth, MedicalReply};
pub use pipeline::{AgentDeps, AgentProfile, PipelineAgent};
pub use registry::{AgentRegistry, DEFAULT_AGENT_ID, create_agent};
