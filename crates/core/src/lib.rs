//! # MedChat Core
//!
//! Domain types, traits, and error definitions for the MedChat backend.
//! This crate has **no framework dependencies**: it defines the domain model
//! that every other crate implements against.
//!
//! ## Layout
//!
//! Every external collaborator is a trait here:
//! - [`Provider`]: an LLM vendor integration (OpenAI, Anthropic, Groq)
//! - [`MemorySystem`]: one memory store (short-term, semantic, episodic, procedural)
//! - [`Agent`]: a chat pipeline variant dispatched by string id
//! - [`PatientStore`]: persistence for patient records
//!
//! Implementations live in their own crates and are wired together at
//! process start.

pub mod agent;
pub mod error;
pub mod memory;
pub mod message;
pub mod patient;
pub mod provider;

pub use agent::{Agent, AgentInfo, AgentReply, ChatTurn};
pub use error::{
    AgentError, Error, MemoryError, PatientError, ProviderError, Result, ValidationError,
};
pub use memory::{MemoryQuery, MemoryResult, MemorySystem, MemoryType};
pub use message::{Message, Role};
pub use patient::{Patient, PatientCreate, PatientStore, PatientUpdate};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
