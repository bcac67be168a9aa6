//! Bilingual medical chat for GLP-1 obesity treatment.
//!
//! # Flow
//!
//! 1. Get or create the session (an expired one is replaced)
//! 2. Score the static knowledge base against the question
//! 3. Build the language-specific system prompt with the top items
//! 4. Call the LLM with the system prompt, the session history and the question
//! 5. Record both turns in the session
//!
//! An LLM failure yields a fixed apology in the session language instead of
//! an error.

pub mod knowledge;
pub mod service;
pub mod session;

pub use knowledge::{KnowledgeBase, KnowledgeItem, KnowledgeStats};
pub use service::{MedicalChatRequest, MedicalChatService, MedicalHealth, MedicalReply};
pub use session::{ConversationContext, SessionStore, SessionSummary};

use medchat_core::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages the medical assistant answers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Es,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Self::Es),
            "en" => Ok(Self::En),
            other => Err(ValidationError::new(
                "language",
                format!("Unsupported language '{other}', expected 'es' or 'en'"),
            )),
        }
    }
}
