//! The agent chat pipeline shared by every agent variant.
//!
//! # Flow
//!
//! 1. Validate the turn
//! 2. Resolve the provider
//! 3. Gather context from the memory stores the variant consults
//! 4. Optionally add semantic documents (RAG)
//! 5. Build the variant's system prompt and call the LLM
//! 6. Store the turn in memory (failures are logged, not returned)
//! 7. Return the reply
//!
//! Variants differ only in their [`AgentProfile`]: prompt template and
//! data sources.

use crate::context::ContextAggregator;
use async_trait::async_trait;
use medchat_core::agent::{Agent, AgentInfo, AgentReply, ChatTurn};
use medchat_core::memory::{MemoryQuery, MemoryType};
use medchat_core::message::Message;
use medchat_memory::MemoryManager;
use medchat_providers::{GenerateOptions, LlmService};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Semantic documents added to the context when RAG is on.
const RAG_DOCUMENT_LIMIT: usize = 3;

/// Shared services every agent is built from.
#[derive(Clone)]
pub struct AgentDeps {
    pub llm: Arc<LlmService>,
    pub memory: Arc<MemoryManager>,
    pub aggregator: Arc<ContextAggregator>,
}

impl AgentDeps {
    pub fn new(llm: Arc<LlmService>, memory: Arc<MemoryManager>) -> Self {
        let aggregator = Arc::new(ContextAggregator::new(memory.clone()));
        Self {
            llm,
            memory,
            aggregator,
        }
    }
}

/// What makes one agent variant different from another.
pub trait AgentProfile: Send + Sync {
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the settings this variant understands.
    fn settings_schema(&self) -> serde_json::Value;

    /// Memory stores this variant may consult.
    fn memory_types(&self) -> &'static [MemoryType] {
        &MemoryType::ALL
    }

    /// Whether this variant adds semantic documents when the turn allows RAG.
    fn uses_rag(&self) -> bool {
        true
    }

    /// The system prompt, with `context` already gathered for this turn.
    fn system_prompt(&self, context: Option<&str>, turn: &ChatTurn) -> String;
}

/// An [`Agent`] running the shared pipeline with one profile.
pub struct PipelineAgent {
    profile: Box<dyn AgentProfile>,
    deps: AgentDeps,
}

impl PipelineAgent {
    pub fn new(profile: impl AgentProfile + 'static, deps: AgentDeps) -> Self {
        Self {
            profile: Box::new(profile),
            deps,
        }
    }

    /// Stores to query for this turn: the variant's types, narrowed to the
    /// enabled ones and to the turn's own selection.
    fn memory_types_for(&self, turn: &ChatTurn) -> Vec<MemoryType> {
        if !turn.use_memory {
            return Vec::new();
        }
        let enabled = self.deps.memory.config().enabled_types();
        self.profile
            .memory_types()
            .iter()
            .copied()
            .filter(|t| enabled.contains(t))
            .filter(|t| turn.memory_types.as_ref().is_none_or(|wanted| wanted.contains(t)))
            .collect()
    }

    async fn gather_context(
        &self,
        turn: &ChatTurn,
        conversation_id: &str,
        types: &[MemoryType],
    ) -> ContextStats {
        let mut stats = ContextStats::default();

        if !types.is_empty() {
            let query = MemoryQuery::new(turn.message.as_str())
                .conversation(conversation_id)
                .types(types.iter().copied())
                .weights(turn.memory_weights.clone().unwrap_or_default())
                .limit(self.deps.memory.config().limit_per_type);

            match self.deps.aggregator.aggregate(&query).await {
                Ok(aggregated) => {
                    stats.text = aggregated.rendered;
                    stats.failed_types = aggregated.failed_types;
                    stats.truncated = aggregated.truncated;
                }
                Err(e) => warn!(agent_id = self.profile.id(), error = %e, "Error getting unified context"),
            }
        }

        if turn.use_rag && self.profile.uses_rag() {
            match self
                .deps
                .memory
                .search_memory(MemoryType::Semantic, &turn.message, RAG_DOCUMENT_LIMIT, None)
                .await
            {
                Ok(docs) if !docs.is_empty() => {
                    let texts: Vec<&str> = docs.iter().filter_map(|d| d.field("text")).collect();
                    stats.text.push_str("\n\nRelevant documents:\n");
                    stats.text.push_str(&texts.join("\n"));
                    stats.rag_documents = docs.len();
                }
                Ok(_) => {}
                Err(e) => warn!(agent_id = self.profile.id(), error = %e, "Error searching documents"),
            }
        }

        stats
    }
}

#[derive(Default)]
struct ContextStats {
    text: String,
    failed_types: Vec<MemoryType>,
    truncated: bool,
    rag_documents: usize,
}

#[async_trait]
impl Agent for PipelineAgent {
    fn id(&self) -> &str {
        self.profile.id()
    }

    fn name(&self) -> &str {
        self.profile.name()
    }

    fn info(&self) -> AgentInfo {
        AgentInfo {
            id: self.profile.id().to_string(),
            name: self.profile.name().to_string(),
            description: self.profile.description().to_string(),
            settings_schema: self.profile.settings_schema(),
        }
    }

    async fn process(&self, turn: ChatTurn) -> medchat_core::Result<AgentReply> {
        let started = Instant::now();
        turn.validate()?;

        let selected = self.deps.llm.select(turn.provider.as_deref())?;
        let conversation_id = turn
            .conversation_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        info!(
            agent_id = self.profile.id(),
            conversation_id = %conversation_id,
            provider = %selected.name,
            message_chars = turn.message.chars().count(),
            "Processing chat request"
        );

        let types = self.memory_types_for(&turn);
        let context = self.gather_context(&turn, &conversation_id, &types).await;
        let context_text = Some(context.text.as_str()).filter(|c| !c.trim().is_empty());

        let opts = GenerateOptions {
            provider: Some(selected.name.clone()),
            system_prompt: turn.system_prompt.clone(),
            temperature: turn.temperature,
            max_tokens: turn.max_tokens,
        };
        let generated = if turn.system_prompt.is_some() {
            self.deps
                .llm
                .generate_response(&turn.message, context_text, &opts)
                .await
        } else {
            let system = self.profile.system_prompt(context_text, &turn);
            let messages = vec![Message::system(system), Message::user(turn.message.as_str())];
            self.deps.llm.chat(messages, &opts).await
        };
        let reply = generated.map_err(|e| {
            error!(agent_id = self.profile.id(), conversation_id = %conversation_id, error = %e, "Error generating response");
            e
        })?;

        let memory_sources: BTreeMap<MemoryType, bool> = MemoryType::ALL
            .into_iter()
            .map(|t| (t, types.contains(&t)))
            .collect();

        if !types.is_empty() {
            let mut metadata = serde_json::Map::new();
            metadata.insert("provider".into(), json!(reply.provider));
            metadata.insert("model".into(), json!(reply.model));
            metadata.insert("agent_id".into(), json!(self.profile.id()));
            metadata.insert("agent_name".into(), json!(self.profile.name()));
            metadata.insert("memory_sources".into(), json!(memory_sources));
            if let Err(e) = self
                .deps
                .memory
                .store_conversation(
                    &conversation_id,
                    Some(turn.message.as_str()),
                    Some(reply.text.as_str()),
                    metadata,
                )
                .await
            {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to store conversation in memory");
            }
        }

        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "settings".into(),
            json!({
                "use_memory": turn.use_memory,
                "use_rag": turn.use_rag,
                "temperature": turn.temperature,
                "max_tokens": turn.max_tokens,
                "memory_types": types,
            }),
        );
        metadata.insert(
            "metrics".into(),
            json!({
                "model": reply.model,
                "context_chars": context.text.chars().count(),
                "context_truncated": context.truncated,
                "failed_memory_types": context.failed_types,
                "rag_documents": context.rag_documents,
                "total_tokens": reply.usage.map(|u| u.total_tokens),
                "llm_ms": reply.elapsed.as_millis() as u64,
                "elapsed_ms": started.elapsed().as_millis() as u64,
            }),
        );

        Ok(AgentReply {
            message: reply.text,
            conversation_id,
            provider: reply.provider,
            agent_id: self.profile.id().to_string(),
            agent_name: self.profile.name().to_string(),
            memory_sources,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::StandardAgent;
    use crate::test_helpers::{ScriptedProvider, llm_with, seeded_memory};
    use medchat_core::error::{Error, ProviderError};

    async fn agent(provider: Arc<ScriptedProvider>) -> (PipelineAgent, Arc<MemoryManager>) {
        let memory = seeded_memory().await;
        let deps = AgentDeps::new(llm_with(provider), memory.clone());
        (PipelineAgent::new(StandardAgent, deps), memory)
    }

    #[tokio::test]
    async fn context_reaches_the_system_prompt() {
        let provider = ScriptedProvider::answering("openai", "Take it weekly");
        let (agent, _) = agent(provider.clone()).await;

        let mut turn = ChatTurn::new("How often is Ozempic injected?");
        turn.conversation_id = Some("c1".into());
        let reply = agent.process(turn).await.unwrap();

        assert_eq!(reply.message, "Take it weekly");
        assert_eq!(reply.conversation_id, "c1");
        assert_eq!(reply.provider, "openai");
        assert_eq!(reply.agent_id, "standard");
        assert!(reply.memory_sources.values().all(|used| *used));

        let system = provider.last_system_prompt();
        assert!(system.contains("## Recent Conversation Context"));
        assert!(system.contains("Relevant documents:\nOzempic is injected once weekly"));
        assert_eq!(reply.metadata["metrics"]["rag_documents"], 2);
    }

    #[tokio::test]
    async fn turn_is_stored_in_memory() {
        let provider = ScriptedProvider::answering("openai", "Drink water");
        let (agent, memory) = agent(provider).await;

        let reply = agent.process(ChatTurn::new("Any tips for nausea?")).await.unwrap();
        let stored = memory
            .search_memory(MemoryType::Episodic, "", 5, Some(&reply.conversation_id))
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].field("assistant_message"), Some("Drink water"));
        assert_eq!(stored[0].metadata["agent_id"], "standard");
    }

    #[tokio::test]
    async fn memory_off_skips_context_and_storage() {
        let provider = ScriptedProvider::answering("openai", "ok");
        let (agent, memory) = agent(provider.clone()).await;

        let mut turn = ChatTurn::new("Ozempic question");
        turn.use_memory = false;
        turn.use_rag = false;
        let reply = agent.process(turn).await.unwrap();

        assert!(reply.memory_sources.values().all(|used| !used));
        assert!(!provider.last_system_prompt().contains("following information"));
        let stored = memory
            .search_memory(MemoryType::Episodic, "", 5, Some(&reply.conversation_id))
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn requested_memory_types_narrow_the_lookup() {
        let provider = ScriptedProvider::answering("openai", "ok");
        let (agent, _) = agent(provider).await;

        let mut turn = ChatTurn::new("Ozempic question");
        turn.memory_types = Some(vec![MemoryType::Semantic]);
        let reply = agent.process(turn).await.unwrap();

        assert!(reply.memory_sources[&MemoryType::Semantic]);
        assert!(!reply.memory_sources[&MemoryType::Episodic]);
    }

    #[tokio::test]
    async fn custom_system_prompt_replaces_template() {
        let provider = ScriptedProvider::answering("openai", "ok");
        let (agent, _) = agent(provider.clone()).await;

        let mut turn = ChatTurn::new("hi");
        turn.system_prompt = Some("Answer in one word.".into());
        turn.use_memory = false;
        turn.use_rag = false;
        agent.process(turn).await.unwrap();

        assert_eq!(provider.last_system_prompt(), "Answer in one word.");
    }

    #[tokio::test]
    async fn unconfigured_provider_is_rejected_before_the_llm_call() {
        let provider = ScriptedProvider::answering("openai", "ok");
        let (agent, _) = agent(provider.clone()).await;

        let mut turn = ChatTurn::new("hi");
        turn.provider = Some("groq".into());
        let err = agent.process(turn).await.unwrap_err();

        assert!(matches!(err, Error::Provider(ProviderError::NotConfigured(_))));
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let provider = ScriptedProvider::failing(
            "openai",
            ProviderError::ApiError {
                status_code: 500,
                message: "boom".into(),
            },
        );
        let (agent, _) = agent(provider).await;
        let err = agent.process(ChatTurn::new("hi")).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::ApiError { .. })));
    }

    #[tokio::test]
    async fn blank_message_is_a_validation_error() {
        let provider = ScriptedProvider::answering("openai", "ok");
        let (agent, _) = agent(provider).await;
        let err = agent.process(ChatTurn::new("  ")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
