//! Agent trait and the request/reply types of the agent chat pipeline.

use crate::error::{Result, ValidationError};
use crate::memory::MemoryType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One inbound agent-chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// The user's message
    pub message: String,

    /// Existing conversation ID (omit to start a new one)
    #[serde(default)]
    pub conversation_id: Option<String>,

    /// Requested LLM provider ("openai", "anthropic", "groq")
    #[serde(default)]
    pub provider: Option<String>,

    /// Which agent handles the turn (omit for the default agent)
    #[serde(default)]
    pub agent_id: Option<String>,

    #[serde(default = "default_true")]
    pub use_memory: bool,

    #[serde(default = "default_true")]
    pub use_rag: bool,

    /// Restrict memory lookups to these types
    #[serde(default)]
    pub memory_types: Option<Vec<MemoryType>>,

    /// Per-type weights, validated but not applied to ranking
    #[serde(default)]
    pub memory_weights: Option<HashMap<MemoryType, f32>>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Replaces the agent's base prompt when set
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_temperature() -> f32 {
    0.7
}

impl ChatTurn {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
            provider: None,
            agent_id: None,
            use_memory: true,
            use_rag: true,
            memory_types: None,
            memory_weights: None,
            temperature: default_temperature(),
            max_tokens: None,
            system_prompt: None,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::new("message", "Message cannot be empty"));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ValidationError::new(
                "temperature",
                "must be between 0.0 and 1.0",
            ));
        }
        if let Some(weights) = &self.memory_weights {
            if let Some((t, w)) = weights.iter().find(|(_, w)| !(0.0..=1.0).contains(*w)) {
                return Err(ValidationError::new(
                    "memory_weights",
                    format!("weight for {t} must be within [0, 1], got {w}"),
                ));
            }
        }
        Ok(())
    }
}

/// The agent's answer to one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    pub message: String,
    pub conversation_id: String,
    pub provider: String,
    pub agent_id: String,
    pub agent_name: String,
    /// Which memory stores contributed context
    pub memory_sources: BTreeMap<MemoryType, bool>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Registry listing entry for an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub settings_schema: serde_json::Value,
}

/// A chat pipeline variant.
///
/// Implementations differ in prompt template and in which data sources
/// they consult; the pipeline shape is shared.
#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn info(&self) -> AgentInfo;

    async fn process(&self, turn: ChatTurn) -> Result<AgentReply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_turn_defaults_from_json() {
        let turn: ChatTurn = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        assert!(turn.use_memory);
        assert!(turn.use_rag);
        assert!((turn.temperature - 0.7).abs() < f32::EPSILON);
        assert!(turn.agent_id.is_none());
    }

    #[test]
    fn blank_message_is_invalid() {
        assert!(ChatTurn::new("   ").validate().is_err());
        assert!(ChatTurn::new("hi").validate().is_ok());
    }

    #[test]
    fn out_of_range_temperature_is_invalid() {
        let mut turn = ChatTurn::new("hi");
        turn.temperature = 1.5;
        assert!(turn.validate().is_err());
    }
}
