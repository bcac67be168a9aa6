//! Memory system implementations for MedChat.
//!
//! Every store keeps its records in process behind a `tokio::sync::RwLock`.
//! The shapes mirror the external stores they stand in for: short-term is
//! keyed per conversation with a TTL, semantic holds documents, episodic holds
//! conversation records, and procedural holds named step lists.

pub mod episodic;
pub mod in_memory;
pub mod manager;
pub mod noop;
pub mod procedural;
pub mod semantic;
pub mod short_term;
pub mod text;

pub use episodic::EpisodicMemory;
pub use in_memory::{InMemoryStore, Record};
pub use manager::MemoryManager;
pub use noop::NoopMemory;
pub use procedural::ProceduralMemory;
pub use semantic::SemanticMemory;
pub use short_term::ShortTermMemory;
