//! Shared test helpers: scripted providers, failing memory stores and
//! ready-made service wiring.

use async_trait::async_trait;
use medchat_config::AppConfig;
use medchat_core::error::{MemoryError, ProviderError};
use medchat_core::memory::{MemoryResult, MemorySystem, MemoryType};
use medchat_core::message::Message;
use medchat_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use medchat_memory::MemoryManager;
use medchat_providers::{LlmService, ProviderRouter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers every call with the same text and records each request.
pub struct ScriptedProvider {
    name: &'static str,
    reply: Result<String, ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn answering(name: &'static str, text: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &'static str, error: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_system_prompt(&self) -> String {
        self.requests()
            .last()
            .and_then(|r| r.messages.first().cloned())
            .map(|m| m.content)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let text = self.reply.clone()?;
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }
}

/// An `LlmService` whose "openai" provider is `provider`.
pub fn llm_with(provider: Arc<ScriptedProvider>) -> Arc<LlmService> {
    let mut config = AppConfig::default();
    config.providers.openai.api_key = Some("sk-test".into());
    let mut router = ProviderRouter::new("openai");
    router.register("openai", provider);
    Arc::new(LlmService::new(Arc::new(router), Arc::new(config)))
}

/// How a [`BrokenMemory`] misbehaves.
#[derive(Clone, Copy)]
pub enum Breakage {
    Error,
    Hang,
}

/// A memory system whose searches always fail or never finish.
pub struct BrokenMemory {
    memory_type: MemoryType,
    breakage: Breakage,
}

impl BrokenMemory {
    pub fn new(memory_type: MemoryType, breakage: Breakage) -> Arc<Self> {
        Arc::new(Self {
            memory_type,
            breakage,
        })
    }
}

#[async_trait]
impl MemorySystem for BrokenMemory {
    fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    async fn store(
        &self,
        _key: &str,
        _content: serde_json::Value,
        _metadata: serde_json::Map<String, serde_json::Value>,
        _conversation_id: Option<&str>,
    ) -> Result<String, MemoryError> {
        Err(MemoryError::Connection(self.memory_type.to_string()))
    }

    async fn retrieve(&self, _key: &str) -> Result<Option<MemoryResult>, MemoryError> {
        Err(MemoryError::Connection(self.memory_type.to_string()))
    }

    async fn search(
        &self,
        _query: &str,
        _limit: usize,
        _conversation_id: Option<&str>,
    ) -> Result<Vec<MemoryResult>, MemoryError> {
        match self.breakage {
            Breakage::Error => Err(MemoryError::Retrieval {
                memory_type: self.memory_type.to_string(),
                reason: "connection refused".into(),
            }),
            Breakage::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn delete(&self, _key: &str) -> Result<bool, MemoryError> {
        Ok(false)
    }

    async fn clear(&self, _conversation_id: Option<&str>) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        false
    }
}

/// A memory manager with every in-process store and some seeded content.
pub async fn seeded_memory() -> Arc<MemoryManager> {
    let manager = MemoryManager::from_config(&Default::default());

    manager
        .store_conversation(
            "c1",
            Some("I started Ozempic last week"),
            Some("Nausea is common during the first weeks"),
            Default::default(),
        )
        .await
        .unwrap();

    for (key, text) in [
        ("doc-1", "Ozempic is injected once weekly"),
        ("doc-2", "Nausea usually improves after 4 to 8 weeks of Ozempic"),
    ] {
        manager
            .store_memory(
                MemoryType::Semantic,
                serde_json::json!(text),
                Default::default(),
                Some(key),
                None,
            )
            .await
            .unwrap();
    }

    manager
        .store_memory(
            MemoryType::Procedural,
            serde_json::json!({
                "name": "Ozempic injection",
                "steps": [{"action": "Clean the area"}, {"action": "Inject slowly"}]
            }),
            Default::default(),
            None,
            None,
        )
        .await
        .unwrap();

    Arc::new(manager)
}
