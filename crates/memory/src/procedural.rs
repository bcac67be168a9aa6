//! Procedural memory: named procedures with ordered steps.
//!
//! The procedure name is its key. Stored content has the shape
//! `{name, description, steps: [{action, description?, parameters?}]}`.

use crate::in_memory::{InMemoryStore, Record};
use crate::text::contains_ci;
use async_trait::async_trait;
use medchat_core::error::MemoryError;
use medchat_core::memory::{MemoryResult, MemorySystem, MemoryType};

/// Relevance of a hit on a step rather than on the procedure itself.
const STEP_MATCH_RELEVANCE: f32 = 0.5;

#[derive(Default)]
pub struct ProceduralMemory {
    store: InMemoryStore,
}

impl ProceduralMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn step_text(step: &serde_json::Value) -> &str {
        step.as_str()
            .or_else(|| step.get("description").and_then(|d| d.as_str()))
            .or_else(|| step.get("action").and_then(|a| a.as_str()))
            .unwrap_or_default()
    }

    fn score(query: &str, record: &Record) -> f32 {
        let needle = query.trim();
        let name = record.content.get("name").and_then(|n| n.as_str()).unwrap_or_default();
        let description = record
            .content
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or_default();
        if contains_ci(name, needle) || contains_ci(description, needle) {
            return 1.0;
        }
        let step_hit = record
            .content
            .get("steps")
            .and_then(|s| s.as_array())
            .is_some_and(|steps| steps.iter().any(|s| contains_ci(Self::step_text(s), needle)));
        if step_hit { STEP_MATCH_RELEVANCE } else { 0.0 }
    }
}

#[async_trait]
impl MemorySystem for ProceduralMemory {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Procedural
    }

    async fn store(
        &self,
        key: &str,
        content: serde_json::Value,
        metadata: serde_json::Map<String, serde_json::Value>,
        _conversation_id: Option<&str>,
    ) -> Result<String, MemoryError> {
        let name = content
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(key)
            .trim()
            .to_string();
        if name.is_empty() {
            return Err(MemoryError::InvalidInput(
                "Procedure name cannot be empty".into(),
            ));
        }

        let Some(steps) = content.get("steps").and_then(|s| s.as_array()) else {
            return Err(MemoryError::InvalidInput(
                "Content must contain a 'steps' list".into(),
            ));
        };

        let description = content
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or_default();

        let mut record = Record::new(
            name.clone(),
            serde_json::json!({
                "name": name,
                "description": description,
                "steps": steps,
            }),
        );
        record.metadata = metadata;
        self.store.upsert(record).await;

        tracing::debug!(procedure = %name, steps = steps.len(), "Stored procedure");
        Ok(name)
    }

    async fn retrieve(&self, key: &str) -> Result<Option<MemoryResult>, MemoryError> {
        Ok(self
            .store
            .get(key)
            .await
            .map(|r| r.to_result(MemoryType::Procedural, 1.0)))
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        _conversation_id: Option<&str>,
    ) -> Result<Vec<MemoryResult>, MemoryError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<MemoryResult> = self
            .store
            .snapshot()
            .await
            .iter()
            .filter_map(|r| {
                let score = Self::score(query, r);
                (score > 0.0).then(|| r.to_result(MemoryType::Procedural, score))
            })
            .collect();

        results.sort_by(|a, b| a.key.cmp(&b.key));
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
