//! LLM Provider implementations for MedChat.
//!
//! All providers implement the `medchat_core::Provider` trait.
//! The router holds one provider per configured vendor; `select_provider`
//! resolves a request to one of them, and `LlmService` wraps the call.

pub mod anthropic;
pub mod llm;
pub mod manager;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use llm::{GenerateOptions, LlmReply, LlmService};
pub use manager::{ProviderHealth, ProviderManager, ProviderStatus};
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, SelectedProvider, build_from_config, select_provider};
