//! Prompt context gathered from memory.
//!
//! # Sections (in configured order)
//!
//! | Memory type | Heading | Rendered as |
//! |-------------|---------|-------------|
//! | short_term | Recent Conversation Context | User/Assistant turns |
//! | semantic | Relevant Document Information | `Document n: ...` |
//! | episodic | Similar Past Conversations | first two past turns |
//! | procedural | Relevant Procedure | name, then `Step n: ...` |

pub mod aggregator;

pub use aggregator::{AggregatedContext, ContextAggregator, ContextSection, section_label};
