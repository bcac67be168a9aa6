//! Context aggregation: merges hits from every memory store into one
//! bounded prompt section.
//!
//! # Pipeline
//!
//! 1. Validate the query (limit, weights)
//! 2. Search each requested store concurrently, one per-backend timeout each
//! 3. Collect sections in configured type order, whatever the completion order
//! 4. Sort each section by relevance, then recency
//! 5. Render labeled sections and cut the text to the character budget
//!
//! A store that errors or times out contributes an empty section and is
//! listed in `failed_types`; aggregation itself never fails because of a
//! backend. Identical inputs with deterministic stores give identical output.

use medchat_core::error::ValidationError;
use medchat_core::memory::{MemoryQuery, MemoryResult, MemoryType};
use medchat_memory::MemoryManager;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Past conversations shown in the episodic section.
const EPISODIC_RENDER_LIMIT: usize = 2;

// ── Types ─────────────────────────────────────────────────────────────────

/// Hits from one memory store.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSection {
    pub memory_type: MemoryType,
    /// Heading rendered above the section.
    pub label: &'static str,
    /// Relevance descending, ties by recency descending.
    pub results: Vec<MemoryResult>,
}

/// The outcome of one aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedContext {
    /// One section per requested type, in configured type order.
    pub sections: Vec<ContextSection>,
    /// Stores that errored or timed out.
    pub failed_types: Vec<MemoryType>,
    /// Whether the rendered text was cut to fit the budget.
    pub truncated: bool,
    /// Effective per-type weights. Carried for observability only.
    pub weights: HashMap<MemoryType, f32>,
    /// The rendered prompt text; empty when nothing was found.
    pub rendered: String,
}

impl AggregatedContext {
    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    pub fn total_results(&self) -> usize {
        self.sections.iter().map(|s| s.results.len()).sum()
    }

    /// Which stores contributed at least one result.
    pub fn contributing_types(&self) -> BTreeMap<MemoryType, bool> {
        self.sections
            .iter()
            .map(|s| (s.memory_type, !s.results.is_empty()))
            .collect()
    }
}

/// Heading for a memory type's section.
pub fn section_label(memory_type: MemoryType) -> &'static str {
    match memory_type {
        MemoryType::ShortTerm => "## Recent Conversation Context",
        MemoryType::Semantic => "## Relevant Document Information",
        MemoryType::Episodic => "## Similar Past Conversations",
        MemoryType::Procedural => "## Relevant Procedure",
    }
}

// ── Aggregator ────────────────────────────────────────────────────────────

/// Queries the memory stores behind a [`MemoryManager`] and renders one
/// context string. Holds no per-request state; share it behind an `Arc`.
pub struct ContextAggregator {
    memory: Arc<MemoryManager>,
    max_chars: usize,
    backend_timeout: Duration,
}

impl ContextAggregator {
    /// Budget and timeout come from the manager's memory config.
    pub fn new(memory: Arc<MemoryManager>) -> Self {
        let config = memory.config();
        let max_chars = config.max_context_chars;
        let backend_timeout = Duration::from_secs(config.backend_timeout_secs);
        Self {
            memory,
            max_chars,
            backend_timeout,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn memory(&self) -> &Arc<MemoryManager> {
        &self.memory
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Search every requested store and render the merged context.
    ///
    /// Only an invalid query is an error. Missing stores give an empty
    /// section with a warning; failing stores give an empty section and are
    /// listed in `failed_types`. A weight of 0 still queries its store.
    pub async fn aggregate(&self, query: &MemoryQuery) -> Result<AggregatedContext, ValidationError> {
        query.validate()?;

        let types = query.ordered_types();
        let searches = types.iter().map(|memory_type| self.search_one(*memory_type, query));
        let outcomes = futures::future::join_all(searches).await;

        let mut sections = Vec::with_capacity(types.len());
        let mut failed_types = Vec::new();
        for (memory_type, outcome) in types.into_iter().zip(outcomes) {
            let results = match outcome {
                SearchOutcome::Found(mut results) => {
                    results.sort_by(MemoryResult::rank_cmp);
                    results
                }
                SearchOutcome::Missing => Vec::new(),
                SearchOutcome::Failed => {
                    failed_types.push(memory_type);
                    Vec::new()
                }
            };
            sections.push(ContextSection {
                memory_type,
                label: section_label(memory_type),
                results,
            });
        }

        let rendered: Vec<String> = sections
            .iter()
            .filter(|s| !s.results.is_empty())
            .map(render_section)
            .collect();
        let (rendered, truncated) = fit_to_budget(rendered, self.max_chars);

        if truncated {
            debug!(max_chars = self.max_chars, "Aggregated context truncated to budget");
        }

        Ok(AggregatedContext {
            sections,
            failed_types,
            truncated,
            weights: self.effective_weights(query),
            rendered,
        })
    }

    /// Like [`aggregate`](Self::aggregate), restricted to the stores that
    /// are actually registered.
    pub async fn multi_context_query(
        &self,
        query: &MemoryQuery,
    ) -> Result<AggregatedContext, ValidationError> {
        let available = self.memory.available_types();
        let mut query = query.clone();
        query.requested_types.retain(|t| available.contains(t));
        debug!(types = ?query.requested_types, "Running multi-context query");
        self.aggregate(&query).await
    }

    /// Render the unified context for `query` across `types` (all
    /// available stores when `None`). Returns `""` when memory is disabled
    /// or the query is invalid.
    pub async fn create_unified_context(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        types: Option<&[MemoryType]>,
    ) -> String {
        let config = self.memory.config();
        if !config.enabled {
            return String::new();
        }

        let mut memory_query = MemoryQuery::new(query)
            .types(types.map(<[MemoryType]>::to_vec).unwrap_or_else(|| MemoryType::ALL.to_vec()))
            .limit(config.limit_per_type);
        if let Some(id) = conversation_id {
            memory_query = memory_query.conversation(id);
        }

        match self.multi_context_query(&memory_query).await {
            Ok(context) => context.rendered,
            Err(e) => {
                warn!(error = %e, "Error creating unified context");
                String::new()
            }
        }
    }

    async fn search_one(&self, memory_type: MemoryType, query: &MemoryQuery) -> SearchOutcome {
        if self.memory.system(memory_type).is_none() {
            warn!(memory_type = %memory_type, "Memory type not available");
            return SearchOutcome::Missing;
        }

        let search = self.memory.search_memory(
            memory_type,
            &query.query,
            query.limit_per_type,
            query.conversation_id.as_deref(),
        );
        match tokio::time::timeout(self.backend_timeout, search).await {
            Ok(Ok(results)) => SearchOutcome::Found(results),
            Ok(Err(e)) => {
                warn!(memory_type = %memory_type, error = %e, "Memory search failed, section left empty");
                SearchOutcome::Failed
            }
            Err(_) => {
                warn!(
                    memory_type = %memory_type,
                    timeout_ms = u64::try_from(self.backend_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Memory search timed out, section left empty"
                );
                SearchOutcome::Failed
            }
        }
    }

    /// Configured weights overridden by the query's own.
    fn effective_weights(&self, query: &MemoryQuery) -> HashMap<MemoryType, f32> {
        let mut weights = self.memory.config().weights.clone();
        weights.extend(query.weights.iter().map(|(t, w)| (*t, *w)));
        weights
    }
}

enum SearchOutcome {
    Found(Vec<MemoryResult>),
    Missing,
    Failed,
}

// ── Rendering ─────────────────────────────────────────────────────────────

fn render_section(section: &ContextSection) -> String {
    let mut lines: Vec<String> = vec![section.label.to_string()];

    match section.memory_type {
        MemoryType::ShortTerm => {
            for result in &section.results {
                push_turn(&mut lines, result);
                lines.push(String::new());
            }
        }
        MemoryType::Semantic => {
            for (i, result) in section.results.iter().enumerate() {
                let text = result.field("text").unwrap_or_default();
                lines.push(format!("Document {}: {text}", i + 1));
            }
            lines.push(String::new());
        }
        MemoryType::Episodic => {
            for (i, result) in section.results.iter().take(EPISODIC_RENDER_LIMIT).enumerate() {
                lines.push(format!("Past Conversation {}:", i + 1));
                push_turn(&mut lines, result);
                lines.push(String::new());
            }
        }
        MemoryType::Procedural => {
            for result in &section.results {
                lines.push(result.field("name").unwrap_or(result.key.as_str()).to_string());
                let steps = result.content.get("steps").and_then(|s| s.as_array());
                for (n, step) in steps.into_iter().flatten().enumerate() {
                    lines.push(format!("Step {}: {}", n + 1, step_text(step)));
                }
            }
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

fn push_turn(lines: &mut Vec<String>, result: &MemoryResult) {
    lines.push(format!("User: {}", result.field("user_message").unwrap_or_default()));
    lines.push(format!(
        "Assistant: {}",
        result.field("assistant_message").unwrap_or_default()
    ));
}

fn step_text(step: &serde_json::Value) -> &str {
    step.as_str()
        .or_else(|| step.get("description").and_then(|d| d.as_str()))
        .or_else(|| step.get("action").and_then(|a| a.as_str()))
        .unwrap_or_default()
}

// ── Budget ────────────────────────────────────────────────────────────────

/// Join sections with `"\n"` and cut the result to `max_chars` characters.
///
/// Whole sections are dropped from the end first. If the first section
/// alone is too long it is cut at the last line boundary that fits, and
/// hard-cut only when even its first line does not fit.
fn fit_to_budget(mut sections: Vec<String>, max_chars: usize) -> (String, bool) {
    let joined_len = |sections: &[String]| -> usize {
        sections.iter().map(|s| s.chars().count()).sum::<usize>() + sections.len().saturating_sub(1)
    };

    if joined_len(&sections) <= max_chars {
        return (sections.join("\n"), false);
    }

    while sections.len() > 1 && joined_len(&sections) > max_chars {
        sections.pop();
    }
    let text = sections.join("\n");
    if text.chars().count() <= max_chars {
        return (text, true);
    }

    (cut_at_line_boundary(&text, max_chars), true)
}

fn cut_at_line_boundary(text: &str, max_chars: usize) -> String {
    let mut kept = 0;
    let mut last_boundary = None;
    for (chars_seen, (byte_idx, ch)) in text.char_indices().enumerate() {
        // A newline at index `max_chars` still leaves `max_chars` chars before it.
        if ch == '\n' && chars_seen <= max_chars {
            last_boundary = Some(byte_idx);
        }
        if chars_seen >= max_chars {
            break;
        }
        kept = byte_idx + ch.len_utf8();
    }

    match last_boundary {
        Some(end) => text[..end].to_string(),
        None => text[..kept].to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
