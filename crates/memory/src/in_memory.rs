//! Shared record table behind every in-process memory store.

use chrono::{DateTime, Utc};
use medchat_core::memory::{MemoryResult, MemoryType};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One stored item.
#[derive(Debug, Clone)]
pub struct Record {
    pub key: String,
    pub content: serde_json::Value,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub conversation_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(key: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            content,
            metadata: serde_json::Map::new(),
            conversation_id: None,
            timestamp: Utc::now(),
            expires_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn to_result(&self, memory_type: MemoryType, relevance: f32) -> MemoryResult {
        MemoryResult {
            memory_type,
            key: self.key.clone(),
            content: self.content.clone(),
            relevance,
            timestamp: self.timestamp,
            metadata: self.metadata.clone(),
        }
    }
}

/// An ordered, key-unique record table.
///
/// Expired records are invisible to readers and purged on the next write.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<Vec<Record>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, replacing any record with the same key.
    pub async fn upsert(&self, record: Record) {
        let now = Utc::now();
        let mut records = self.records.write().await;
        records.retain(|r| r.key != record.key && !r.is_expired(now));
        records.push(record);
    }

    pub async fn get(&self, key: &str) -> Option<Record> {
        let now = Utc::now();
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.key == key && !r.is_expired(now))
            .cloned()
    }

    pub async fn remove(&self, key: &str) -> bool {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.key != key);
        records.len() < before
    }

    /// Remove every record, or only those of one conversation.
    pub async fn clear(&self, conversation_id: Option<&str>) {
        let mut records = self.records.write().await;
        match conversation_id {
            Some(id) => records.retain(|r| r.conversation_id.as_deref() != Some(id)),
            None => records.clear(),
        }
    }

    /// Live records in insertion order.
    pub async fn snapshot(&self) -> Vec<Record> {
        let now = Utc::now();
        self.records
            .read()
            .await
            .iter()
            .filter(|r| !r.is_expired(now))
            .cloned()
            .collect()
    }

    /// Live records of one conversation, newest first.
    pub async fn conversation(&self, conversation_id: &str) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|r| r.conversation_id.as_deref() == Some(conversation_id))
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }

    pub async fn len(&self) -> usize {
        self.snapshot().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Key format shared by short-term and episodic memory.
pub fn conversation_message_key(conversation_id: &str) -> String {
    format!(
        "conversation:{conversation_id}:message:{}",
        uuid::Uuid::new_v4()
    )
}

/// Extract the conversation id from a `conversation:{id}:...` key.
pub fn conversation_from_key(key: &str) -> Option<&str> {
    let rest = key.strip_prefix("conversation:")?;
    let id = rest.split(':').next()?;
    (!id.is_empty()).then_some(id)
}
