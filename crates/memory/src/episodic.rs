//! Episodic memory: records of past conversation turns.

use crate::in_memory::{InMemoryStore, Record, conversation_from_key};
use crate::text::{contains_ci, term_overlap};
use async_trait::async_trait;
use medchat_core::error::MemoryError;
use medchat_core::memory::{MemoryResult, MemorySystem, MemoryType};

/// Queries of this many words or fewer use substring matching.
const SHORT_QUERY_WORDS: usize = 3;

#[derive(Default)]
pub struct EpisodicMemory {
    store: InMemoryStore,
}

impl EpisodicMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn messages(record: &Record) -> (&str, &str) {
        (
            message_field(record, "user_message"),
            message_field(record, "assistant_message"),
        )
    }

    fn score(query: &str, record: &Record) -> f32 {
        let (user, assistant) = Self::messages(record);
        if query.split_whitespace().count() <= SHORT_QUERY_WORDS {
            let needle = query.trim();
            if contains_ci(user, needle) || contains_ci(assistant, needle) {
                1.0
            } else {
                0.0
            }
        } else {
            term_overlap(query, &format!("{user} {assistant}"))
        }
    }
}

fn message_field<'a>(record: &'a Record, name: &str) -> &'a str {
    record
        .content
        .get(name)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
}

#[async_trait]
impl MemorySystem for EpisodicMemory {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Episodic
    }

    async fn store(
        &self,
        key: &str,
        content: serde_json::Value,
        metadata: serde_json::Map<String, serde_json::Value>,
        conversation_id: Option<&str>,
    ) -> Result<String, MemoryError> {
        let text = |name: &str| {
            content
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let user_message = text("user_message");
        let assistant_message = text("assistant_message");

        if user_message.is_empty() && assistant_message.is_empty() {
            return Err(MemoryError::InvalidInput(
                "Either user_message or assistant_message must be provided".into(),
            ));
        }

        let conversation_id = conversation_id
            .or_else(|| conversation_from_key(key))
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut record = Record::new(
            key,
            serde_json::json!({
                "user_message": user_message,
                "assistant_message": assistant_message,
            }),
        );
        record.metadata = metadata;
        record.conversation_id = Some(conversation_id);
        self.store.upsert(record).await;
        Ok(key.to_string())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<MemoryResult>, MemoryError> {
        Ok(self
            .store
            .get(key)
            .await
            .map(|r| r.to_result(MemoryType::Episodic, 1.0)))
    }

    /// With a conversation id, that conversation's most recent records.
    /// Otherwise records matching the query, best first.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        conversation_id: Option<&str>,
    ) -> Result<Vec<MemoryResult>, MemoryError> {
        if let Some(conversation_id) = conversation_id {
            return Ok(self
                .store
                .conversation(conversation_id)
                .await
                .iter()
                .take(limit)
                .map(|r| r.to_result(MemoryType::Episodic, 1.0))
                .collect());
        }

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
                (score > 0.0).then(|| r.to_result(MemoryType::Episodic, score))
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
        self.store.clear(conversation_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(user: &str, assistant: &str) -> serde_json::Value {
        serde_json::json!({"user_message": user, "assistant_message": assistant})
    }

    async fn seeded() -> EpisodicMemory {
        let mem = EpisodicMemory::new();
        mem.store(
            "conversation:c1:message:1",
            turn("I forgot my Ozempic dose", "Take it within 5 days"),
            Default::default(),
            None,
        )
        .await
        .unwrap();
        mem.store(
            "conversation:c2:message:1",
            turn("How should I store the pen?", "Keep it refrigerated before first use"),
            Default::default(),
            None,
        )
        .await
        .unwrap();
        mem
    }

    #[tokio::test]
    async fn conversation_id_comes_from_key() {
        let mem = seeded().await;
        let results = mem.search("", 5, Some("c2")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].field("user_message"), Some("How should I store the pen?"));
    }

    #[tokio::test]
    async fn short_query_uses_substring_match() {
        let mem = seeded().await;
        let results = mem.search("ozempic DOSE", 5, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "conversation:c1:message:1");
    }

    #[tokio::test]
    async fn long_query_uses_term_overlap() {
        let mem = seeded().await;
        let results = mem
            .search("where do I keep my pen refrigerated", 5, None)
            .await
            .unwrap();
        assert_eq!(results[0].key, "conversation:c2:message:1");
        assert!(results[0].relevance > 0.0 && results[0].relevance < 1.0);
        assert!(results.iter().all(|r| r.relevance <= results[0].relevance));
    }

    #[tokio::test]
    async fn requires_at_least_one_message() {
        let mem = EpisodicMemory::new();
        let err = mem
            .store("k", turn("", ""), Default::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
    }
}
