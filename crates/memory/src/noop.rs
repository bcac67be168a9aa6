//! No-op memory: accepts writes and returns nothing. Stands in for a
//! memory type that is switched off.

use async_trait::async_trait;
use medchat_core::error::MemoryError;
use medchat_core::memory::{MemoryResult, MemorySystem, MemoryType};

pub struct NoopMemory {
    memory_type: MemoryType,
}

impl NoopMemory {
    pub fn new(memory_type: MemoryType) -> Self {
        Self { memory_type }
    }
}

#[async_trait]
impl MemorySystem for NoopMemory {
    fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    async fn store(
        &self,
        key: &str,
        _content: serde_json::Value,
        _metadata: serde_json::Map<String, serde_json::Value>,
        _conversation_id: Option<&str>,
    ) -> Result<String, MemoryError> {
        Ok(key.to_string())
    }

    async fn retrieve(&self, _key: &str) -> Result<Option<MemoryResult>, MemoryError> {
        Ok(None)
    }

    async fn search(
        &self,
        _query: &str,
        _limit: usize,
        _conversation_id: Option<&str>,
    ) -> Result<Vec<MemoryResult>, MemoryError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _key: &str) -> Result<bool, MemoryError> {
        Ok(false)
    }

    async fn clear(&self, _conversation_id: Option<&str>) -> Result<(), MemoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_nothing() {
        let mem = NoopMemory::new(MemoryType::Semantic);
        let key = mem
            .store("k", serde_json::json!({"text": "x"}), Default::default(), None)
            .await
            .unwrap();
        assert_eq!(key, "k");
        assert!(mem.search("x", 5, None).await.unwrap().is_empty());
        assert!(mem.retrieve("k").await.unwrap().is_none());
        assert!(mem.health_check().await);
    }
}
