//! Memory manager: owns one `MemorySystem` per memory type and routes
//! stores and searches to them.

use crate::in_memory::conversation_message_key;
use crate::{EpisodicMemory, NoopMemory, ProceduralMemory, SemanticMemory, ShortTermMemory};
use chrono::Utc;
use medchat_config::MemoryConfig;
use medchat_core::error::MemoryError;
use medchat_core::memory::{MemoryResult, MemorySystem, MemoryType};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct MemoryManager {
    systems: BTreeMap<MemoryType, Arc<dyn MemorySystem>>,
    config: MemoryConfig,
}

impl MemoryManager {
    /// A manager with no systems registered.
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            systems: BTreeMap::new(),
            config,
        }
    }

    /// Register the in-process store for every enabled type. With memory
    /// switched off entirely, every type gets a no-op store.
    pub fn from_config(config: &MemoryConfig) -> Self {
        let mut manager = Self::new(config.clone());

        if !config.enabled {
            for memory_type in MemoryType::ALL {
                manager.register(Arc::new(NoopMemory::new(memory_type)));
            }
            return manager;
        }

        for memory_type in config.enabled_types() {
            let system: Arc<dyn MemorySystem> = match memory_type {
                MemoryType::ShortTerm => Arc::new(ShortTermMemory::new(config.short_term_ttl_secs)),
                MemoryType::Semantic => Arc::new(SemanticMemory::new()),
                MemoryType::Episodic => Arc::new(EpisodicMemory::new()),
                MemoryType::Procedural => Arc::new(ProceduralMemory::new()),
            };
            manager.register(system);
        }
        manager
    }

    /// Register (or replace) the system serving its memory type.
    pub fn register(&mut self, system: Arc<dyn MemorySystem>) {
        self.systems.insert(system.memory_type(), system);
    }

    pub fn with_system(mut self, system: Arc<dyn MemorySystem>) -> Self {
        self.register(system);
        self
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn system(&self, memory_type: MemoryType) -> Option<Arc<dyn MemorySystem>> {
        self.systems.get(&memory_type).cloned()
    }

    /// Registered types, in section order.
    pub fn available_types(&self) -> Vec<MemoryType> {
        self.systems.keys().copied().collect()
    }

    fn require(&self, memory_type: MemoryType) -> Result<&Arc<dyn MemorySystem>, MemoryError> {
        self.systems
            .get(&memory_type)
            .ok_or_else(|| MemoryError::Unavailable(memory_type.to_string()))
    }

    /// Health-check every registered system and log the outcome.
    pub async fn initialize(&self) -> BTreeMap<MemoryType, bool> {
        info!(types = ?self.available_types(), "Initializing memory systems");
        let health = self.health_check().await;
        for (memory_type, healthy) in &health {
            if *healthy {
                info!(memory_type = %memory_type, "Memory system initialized");
            } else {
                warn!(memory_type = %memory_type, "Memory system is unhealthy or unavailable");
            }
        }
        health
    }

    pub async fn health_check(&self) -> BTreeMap<MemoryType, bool> {
        let checks = self.systems.iter().map(|(memory_type, system)| async move {
            (*memory_type, system.health_check().await)
        });
        futures::future::join_all(checks).await.into_iter().collect()
    }

    /// Store `content` in one memory type. Without an explicit key one is
    /// generated as `"{type}:{uuid}"`.
    pub async fn store_memory(
        &self,
        memory_type: MemoryType,
        content: serde_json::Value,
        mut metadata: serde_json::Map<String, serde_json::Value>,
        key: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<String, MemoryError> {
        let system = self.require(memory_type)?;
        let key = key
            .map(str::to_string)
            .unwrap_or_else(|| format!("{memory_type}:{}", uuid::Uuid::new_v4()));
        metadata.insert("timestamp".into(), serde_json::json!(Utc::now()));
        system.store(&key, content, metadata, conversation_id).await
    }

    /// Store one conversation turn in episodic memory and, when available,
    /// short-term memory. Returns the key used.
    pub async fn store_conversation(
        &self,
        conversation_id: &str,
        user_message: Option<&str>,
        assistant_message: Option<&str>,
        mut metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, MemoryError> {
        let user_message = user_message.unwrap_or_default();
        let assistant_message = assistant_message.unwrap_or_default();
        if user_message.is_empty() && assistant_message.is_empty() {
            return Err(MemoryError::InvalidInput(
                "Content must contain either user_message or assistant_message".into(),
            ));
        }

        let targets: Vec<&Arc<dyn MemorySystem>> = [MemoryType::Episodic, MemoryType::ShortTerm]
            .iter()
            .filter_map(|t| self.systems.get(t))
            .collect();
        if targets.is_empty() {
            return Err(MemoryError::Unavailable("episodic".into()));
        }

        let key = conversation_message_key(conversation_id);
        metadata.insert("conversation_id".into(), serde_json::json!(conversation_id));
        metadata.insert("timestamp".into(), serde_json::json!(Utc::now()));
        let content = serde_json::json!({
            "user_message": user_message,
            "assistant_message": assistant_message,
        });

        for system in targets {
            system
                .store(&key, content.clone(), metadata.clone(), Some(conversation_id))
                .await
                .map_err(|e| MemoryError::Storage {
                    memory_type: system.memory_type().to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(key)
    }

    pub async fn retrieve_memory(
        &self,
        memory_type: MemoryType,
        key: &str,
    ) -> Result<Option<MemoryResult>, MemoryError> {
        self.require(memory_type)?.retrieve(key).await
    }

    pub async fn search_memory(
        &self,
        memory_type: MemoryType,
        query: &str,
        limit: usize,
        conversation_id: Option<&str>,
    ) -> Result<Vec<MemoryResult>, MemoryError> {
        let conversation_id = conversation_id.filter(|_| memory_type.is_conversational());
        self.require(memory_type)?
            .search(query, limit, conversation_id)
            .await
    }

    pub async fn close(&self) {
        for (memory_type, system) in &self.systems {
            system.close().await;
            info!(memory_type = %memory_type, "Memory system closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_config_registers_enabled_types() {
        let config = MemoryConfig {
            procedural: false,
            ..MemoryConfig::default()
        };
        let manager = MemoryManager::from_config(&config);
        assert_eq!(
            manager.available_types(),
            vec![MemoryType::ShortTerm, MemoryType::Semantic, MemoryType::Episodic]
        );
        let health = manager.initialize().await;
        assert!(health.values().all(|h| *h));
    }

    #[tokio::test]
    async fn disabled_memory_uses_noop_stores() {
        let config = MemoryConfig {
            enabled: false,
            ..MemoryConfig::default()
        };
        let manager = MemoryManager::from_config(&config);
        assert_eq!(manager.available_types().len(), 4);
        manager
            .store_conversation("c1", Some("hola"), Some("buenas"), Default::default())
            .await
            .unwrap();
        assert!(
            manager
                .search_memory(MemoryType::Episodic, "hola", 5, Some("c1"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn store_conversation_writes_episodic_and_short_term() {
        let manager = MemoryManager::from_config(&MemoryConfig::default());
        let key = manager
            .store_conversation("c1", Some("¿Puedo hacer ejercicio?"), Some("Sí"), Default::default())
            .await
            .unwrap();
        assert!(key.starts_with("conversation:c1:message:"));

        for memory_type in [MemoryType::Episodic, MemoryType::ShortTerm] {
            let hits = manager
                .search_memory(memory_type, "", 5, Some("c1"))
                .await
                .unwrap();
            assert_eq!(hits.len(), 1, "{memory_type}");
            assert_eq!(hits[0].metadata["conversation_id"], "c1");
        }
    }

    #[tokio::test]
    async fn store_conversation_requires_a_message() {
        let manager = MemoryManager::from_config(&MemoryConfig::default());
        let err = manager
            .store_conversation("c1", None, Some(""), Default::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn store_memory_generates_typed_key() {
        let manager = MemoryManager::from_config(&MemoryConfig::default());
        let key = manager
            .store_memory(
                MemoryType::Semantic,
                serde_json::json!("Semaglutide slows gastric emptying"),
                Default::default(),
                None,
                None,
            )
            .await
            .unwrap();
        assert!(key.starts_with("semantic:"));

        let hit = manager
            .retrieve_memory(MemoryType::Semantic, &key)
            .await
            .unwrap()
            .unwrap();
        assert!(hit.metadata.contains_key("timestamp"));
    }

    #[tokio::test]
    async fn unregistered_type_is_unavailable() {
        let manager = MemoryManager::new(MemoryConfig::default());
        let err = manager
            .search_memory(MemoryType::Procedural, "x", 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Unavailable(_)));
    }
}
