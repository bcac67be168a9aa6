//! Short-term memory: the recent turns of each conversation, expiring
//! after a TTL.

use crate::in_memory::{InMemoryStore, Record, conversation_from_key};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use medchat_core::error::MemoryError;
use medchat_core::memory::{MemoryResult, MemorySystem, MemoryType};
use tracing::{debug, warn};

pub struct ShortTermMemory {
    store: InMemoryStore,
    ttl: Duration,
}

impl ShortTermMemory {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            store: InMemoryStore::new(),
            ttl: Duration::seconds(ttl_secs.min(u64::from(u32::MAX)) as i64),
        }
    }
}

#[async_trait]
impl MemorySystem for ShortTermMemory {
    fn memory_type(&self) -> MemoryType {
        MemoryType::ShortTerm
    }

    async fn store(
        &self,
        key: &str,
        content: serde_json::Value,
        metadata: serde_json::Map<String, serde_json::Value>,
        conversation_id: Option<&str>,
    ) -> Result<String, MemoryError> {
        if !content.is_object() {
            return Err(MemoryError::InvalidInput(
                "short-term content must be an object with user_message/assistant_message".into(),
            ));
        }

        let conversation_id = conversation_id
            .or_else(|| conversation_from_key(key))
            .unwrap_or(key)
            .to_string();

        let now = Utc::now();
        let record = Record {
            key: key.to_string(),
            content,
            metadata,
            conversation_id: Some(conversation_id.clone()),
            timestamp: now,
            expires_at: now.checked_add_signed(self.ttl),
        };
        self.store.upsert(record).await;

        debug!(key, conversation_id = %conversation_id, "Stored message in short-term memory");
        Ok(key.to_string())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<MemoryResult>, MemoryError> {
        Ok(self
            .store
            .get(key)
            .await
            .map(|r| r.to_result(MemoryType::ShortTerm, 1.0)))
    }

    /// The query text is ignored; this returns the newest turns of the
    /// conversation, ranked by recency.
    async fn search(
        &self,
        _query: &str,
        limit: usize,
        conversation_id: Option<&str>,
    ) -> Result<Vec<MemoryResult>, MemoryError> {
        let Some(conversation_id) = conversation_id else {
            warn!("No conversation_id provided for short-term memory search");
            return Ok(Vec::new());
        };

        Ok(self
            .store
            .conversation(conversation_id)
            .await
            .iter()
            .take(limit)
            .enumerate()
            .map(|(rank, r)| r.to_result(MemoryType::ShortTerm, 1.0 / (rank as f32 + 1.0)))
            .collect())
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
    use crate::in_memory::conversation_message_key;

    fn turn(user: &str, assistant: &str) -> serde_json::Value {
        serde_json::json!({"user_message": user, "assistant_message": assistant})
    }

    #[tokio::test]
    async fn search_returns_newest_turns_of_conversation() {
        let mem = ShortTermMemory::new(3600);
        for i in 0..4 {
            let key = conversation_message_key("c1");
            mem.store(&key, turn(&format!("q{i}"), &format!("a{i}")), Default::default(), None)
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        mem.store("other", turn("x", "y"), Default::default(), Some("c2"))
            .await
            .unwrap();

        let results = mem.search("ignored", 2, Some("c1")).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].field("user_message"), Some("q3"));
        assert_eq!(results[1].field("user_message"), Some("q2"));
        assert!(results[0].relevance > results[1].relevance);
    }

    #[tokio::test]
    async fn search_without_conversation_is_empty() {
        let mem = ShortTermMemory::new(3600);
        mem.store("k", turn("q", "a"), Default::default(), Some("c1"))
            .await
            .unwrap();
        assert!(mem.search("q", 5, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let mem = ShortTermMemory::new(0);
        mem.store("k", turn("q", "a"), Default::default(), Some("c1"))
            .await
            .unwrap();
        assert!(mem.retrieve("k").await.unwrap().is_none());
        assert!(mem.search("", 5, Some("c1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_object_content_is_rejected() {
        let mem = ShortTermMemory::new(60);
        let err = mem
            .store("k", serde_json::json!("text"), Default::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn clear_one_conversation() {
        let mem = ShortTermMemory::new(60);
        mem.store("a", turn("q", "a"), Default::default(), Some("c1"))
            .await
            .unwrap();
        mem.store("b", turn("q", "a"), Default::default(), Some("c2"))
            .await
            .unwrap();
        mem.clear(Some("c1")).await.unwrap();
        assert!(mem.search("", 5, Some("c1")).await.unwrap().is_empty());
        assert_eq!(mem.search("", 5, Some("c2")).await.unwrap().len(), 1);
    }
}
