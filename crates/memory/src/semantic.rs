//! Semantic memory: text documents searched by keyword similarity.
//!
//! Similarity is the share of distinct query terms present in the document,
//! so scores fall in [0, 1] like `1 - distance` from a vector store.

use crate::in_memory::{InMemoryStore, Record};
use crate::text::term_overlap;
use async_trait::async_trait;
use medchat_core::error::MemoryError;
use medchat_core::memory::{MemoryResult, MemorySystem, MemoryType};

#[derive(Default)]
pub struct SemanticMemory {
    store: InMemoryStore,
}

impl SemanticMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a bare string or `{"text": ...}`.
    fn document_text(content: &serde_json::Value) -> Option<&str> {
        content
            .as_str()
            .or_else(|| content.get("text").and_then(|t| t.as_str()))
            .filter(|t| !t.trim().is_empty())
    }
}

#[async_trait]
impl MemorySystem for SemanticMemory {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Semantic
    }

    async fn store(
        &self,
        key: &str,
        content: serde_json::Value,
        mut metadata: serde_json::Map<String, serde_json::Value>,
        _conversation_id: Option<&str>,
    ) -> Result<String, MemoryError> {
        let text = Self::document_text(&content).ok_or_else(|| {
            MemoryError::InvalidInput("semantic content must be non-empty text".into())
        })?;

        metadata.insert("key".into(), serde_json::json!(key));
        let mut record = Record::new(key, serde_json::json!({ "text": text }));
        metadata.insert("timestamp".into(), serde_json::json!(record.timestamp));
        record.metadata = metadata;
        self.store.upsert(record).await;

        tracing::debug!(key, content_length = text.len(), "Stored content in semantic memory");
        Ok(key.to_string())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<MemoryResult>, MemoryError> {
        Ok(self
            .store
            .get(key)
            .await
            .map(|r| r.to_result(MemoryType::Semantic, 1.0)))
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        _conversation_id: Option<&str>,
    ) -> Result<Vec<MemoryResult>, MemoryError> {
        let mut results: Vec<MemoryResult> = self
            .store
            .snapshot()
            .await
            .iter()
            .filter_map(|r| {
                let text = r.content.get("text").and_then(|t| t.as_str())?;
                let score = term_overlap(query, text);
                (score > 0.0).then(|| r.to_result(MemoryType::Semantic, score))
            })
            .collect();

        results.sort_by(MemoryResult::rank_cmp);
        results.truncate(limit);
        Ok(results)
    }

    async fn delete(&self, key: &str) -> Result<bool, MemoryError> {
        Ok(self.store.remove(key).await)
    }

    async fn clear(&self, conversation_id: Option<&str>) -> Result<(), MemoryError> {
        if conversation_id.is_none() {
            self.store.clear(None).await;
        }
        Ok(())
    }
}
