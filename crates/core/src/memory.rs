//! Memory trait and the value types that flow through context aggregation.
//!
//! Four kinds of memory back the chat agents:
//! - **short-term**: recent turns of one conversation, expiring after a TTL
//! - **semantic**: document text searched by similarity
//! - **episodic**: past conversation records
//! - **procedural**: named procedures with ordered steps
//!
//! Each is a [`MemorySystem`]. Results from all of them share one shape,
//! [`MemoryResult`], whose `content` is a JSON object specific to the type.

use crate::error::{MemoryError, ValidationError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A memory-type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    ShortTerm,
    Semantic,
    Episodic,
    Procedural,
}

impl MemoryType {
    /// All memory types in the configured section order.
    pub const ALL: [MemoryType; 4] = [
        MemoryType::ShortTerm,
        MemoryType::Semantic,
        MemoryType::Episodic,
        MemoryType::Procedural,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::ShortTerm => "short_term",
            MemoryType::Semantic => "semantic",
            MemoryType::Episodic => "episodic",
            MemoryType::Procedural => "procedural",
        }
    }

    /// Whether searches of this type are scoped by conversation id.
    pub fn is_conversational(&self) -> bool {
        matches!(self, MemoryType::ShortTerm | MemoryType::Episodic)
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "short_term" => Ok(MemoryType::ShortTerm),
            "semantic" => Ok(MemoryType::Semantic),
            "episodic" => Ok(MemoryType::Episodic),
            "procedural" => Ok(MemoryType::Procedural),
            other => Err(ValidationError::new(
                "memory_types",
                format!("unknown memory type '{other}'"),
            )),
        }
    }
}

/// A single search hit from one memory system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryResult {
    /// Which store produced this result
    #[serde(rename = "type")]
    pub memory_type: MemoryType,

    /// Store-specific key
    pub key: String,

    /// Structured content (see module docs for the per-type shape)
    pub content: serde_json::Value,

    /// Relevance score; higher is better
    #[serde(default)]
    pub relevance: f32,

    /// When the underlying item was stored
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl MemoryResult {
    /// Read a string field from the content object.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.content.get(name).and_then(|v| v.as_str())
    }

    /// Relevance descending, then recency descending.
    pub fn rank_cmp(a: &MemoryResult, b: &MemoryResult) -> Ordering {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    }
}

/// A multi-source memory query, built per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQuery {
    /// The search text (usually the user's message)
    pub query: String,

    /// Conversation scope for short-term and episodic memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Which stores to consult; duplicates are ignored
    #[serde(default = "default_types")]
    pub requested_types: Vec<MemoryType>,

    /// Per-type weights in [0, 1]. Carried for ranking but currently inert.
    #[serde(default)]
    pub weights: HashMap<MemoryType, f32>,

    /// Maximum results requested from each store
    #[serde(default = "default_limit")]
    pub limit_per_type: usize,
}

fn default_types() -> Vec<MemoryType> {
    MemoryType::ALL.to_vec()
}

fn default_limit() -> usize {
    5
}

impl MemoryQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            conversation_id: None,
            requested_types: default_types(),
            weights: HashMap::new(),
            limit_per_type: default_limit(),
        }
    }

    pub fn conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn types(mut self, types: impl IntoIterator<Item = MemoryType>) -> Self {
        self.requested_types = types.into_iter().collect();
        self
    }

    pub fn weights(mut self, weights: HashMap<MemoryType, f32>) -> Self {
        self.weights = weights;
        self
    }

    pub fn limit(mut self, limit_per_type: usize) -> Self {
        self.limit_per_type = limit_per_type;
        self
    }

    /// Requested types, de-duplicated, in configured section order.
    pub fn ordered_types(&self) -> Vec<MemoryType> {
        MemoryType::ALL
            .into_iter()
            .filter(|t| self.requested_types.contains(t))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.limit_per_type == 0 {
            return Err(ValidationError::new(
                "limit_per_type",
                "must be a positive integer",
            ));
        }
        for (memory_type, weight) in &self.weights {
            if !(0.0..=1.0).contains(weight) {
                return Err(ValidationError::new(
                    "weights",
                    format!("weight for {memory_type} must be within [0, 1], got {weight}"),
                ));
            }
        }
        Ok(())
    }
}

/// The core MemorySystem trait.
///
/// Implementations: in-process short-term, semantic, episodic and procedural
/// stores, plus a no-op store used when memory is disabled.
#[async_trait]
pub trait MemorySystem: Send + Sync {
    /// Which memory type this system serves.
    fn memory_type(&self) -> MemoryType;

    /// Store content under `key`. Returns the key actually used.
    async fn store(
        &self,
        key: &str,
        content: serde_json::Value,
        metadata: serde_json::Map<String, serde_json::Value>,
        conversation_id: Option<&str>,
    ) -> std::result::Result<String, MemoryError>;

    /// Fetch a single item by key.
    async fn retrieve(&self, key: &str) -> std::result::Result<Option<MemoryResult>, MemoryError>;

    /// Search for up to `limit` results.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        conversation_id: Option<&str>,
    ) -> std::result::Result<Vec<MemoryResult>, MemoryError>;

    /// Delete an item by key. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> std::result::Result<bool, MemoryError>;

    /// Remove all items, or only those of one conversation.
    async fn clear(&self, conversation_id: Option<&str>) -> std::result::Result<(), MemoryError>;

    /// Is the backing store reachable?
    async fn health_check(&self) -> bool {
        true
    }

    /// Release any held resources.
    async fn close(&self) {}
}
