//! `/api`: memory-enhanced agent chat and memory inspection.

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use medchat_core::agent::{AgentInfo, ChatTurn};
use medchat_core::error::ValidationError;
use medchat_core::memory::{MemoryQuery, MemoryType};
use medchat_providers::ProviderHealth;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

use crate::SharedState;
use crate::error::{ApiError, ApiJson, ApiQuery};

/// Build the router. Nest this under "/api".
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/chat", post(agent_chat_handler))
        .route("/chat/agents", get(list_agents_handler))
        .route("/chat/providers", get(list_providers_handler))
        .route("/memory/context", get(memory_context_handler))
        .route("/memory/health", get(memory_health_handler))
}

// ── Agent chat ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AgentChatResponse {
    message: String,
    conversation_id: String,
    provider: String,
    agent_id: String,
    agent_name: String,
    memory_sources: BTreeMap<MemoryType, bool>,
    timestamp: DateTime<Utc>,
    processing_time_ms: u64,
    metadata: serde_json::Map<String, serde_json::Value>,
}

async fn agent_chat_handler(
    State(state): State<SharedState>,
    ApiJson(turn): ApiJson<ChatTurn>,
) -> Result<Json<AgentChatResponse>, ApiError> {
    let started = Instant::now();
    turn.validate()?;
    let agent = state.agents.resolve(turn.agent_id.as_deref())?;
    info!(agent_id = agent.id(), provider = ?turn.provider, "Agent chat request");

    let reply = agent.process(turn).await?;

    Ok(Json(AgentChatResponse {
        message: reply.message,
        conversation_id: reply.conversation_id,
        provider: reply.provider,
        agent_id: reply.agent_id,
        agent_name: reply.agent_name,
        memory_sources: reply.memory_sources,
        timestamp: Utc::now(),
        processing_time_ms: started.elapsed().as_millis() as u64,
        metadata: reply.metadata,
    }))
}

#[derive(Serialize)]
struct AgentListResponse {
    agents: Vec<AgentInfo>,
    default_agent_id: String,
}

async fn list_agents_handler(State(state): State<SharedState>) -> Json<AgentListResponse> {
    Json(AgentListResponse {
        agents: state.agents.list_agents(),
        default_agent_id: state.agents.default_agent_id().to_string(),
    })
}

#[derive(Serialize)]
struct ProviderListResponse {
    providers: Vec<&'static str>,
    default: String,
    status: ProviderHealth,
}

async fn list_providers_handler(State(state): State<SharedState>) -> Json<ProviderListResponse> {
    Json(ProviderListResponse {
        providers: state.config.configured_providers(),
        default: state.config.default_provider.clone(),
        status: state.providers.health_check_all().await,
    })
}

// ── Memory ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct MemoryContextParams {
    query: String,
    #[serde(default)]
    conversation_id: Option<String>,
    /// Comma-separated memory type tags
    #[serde(default)]
    memory_types: Option<String>,
}

#[derive(Serialize)]
struct MemoryContextResponse {
    query: String,
    conversation_id: Option<String>,
    context: String,
    context_length: usize,
    memory_types: Vec<MemoryType>,
    sources: BTreeMap<MemoryType, bool>,
    failed_types: Vec<MemoryType>,
    truncated: bool,
    total_results: usize,
}

fn parse_memory_types(raw: Option<&str>) -> Result<Vec<MemoryType>, ValidationError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(MemoryType::ALL.to_vec()),
        Some(list) => list
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(str::parse)
            .collect(),
    }
}

async fn memory_context_handler(
    State(state): State<SharedState>,
    ApiQuery(params): ApiQuery<MemoryContextParams>,
) -> Result<Json<MemoryContextResponse>, ApiError> {
    if params.query.trim().is_empty() {
        return Err(ValidationError::new("query", "Query cannot be empty").into());
    }
    let types = parse_memory_types(params.memory_types.as_deref())?;

    let config = state.memory.config();
    if !config.enabled {
        return Ok(Json(MemoryContextResponse {
            query: params.query,
            conversation_id: params.conversation_id,
            context: String::new(),
            context_length: 0,
            memory_types: Vec::new(),
            sources: BTreeMap::new(),
            failed_types: Vec::new(),
            truncated: false,
            total_results: 0,
        }));
    }

    let mut query = MemoryQuery::new(params.query.clone())
        .types(types)
        .limit(config.limit_per_type);
    if let Some(id) = &params.conversation_id {
        query = query.conversation(id.clone());
    }

    let context = state.aggregator.multi_context_query(&query).await?;
    Ok(Json(MemoryContextResponse {
        context_length: context.rendered.chars().count(),
        memory_types: context.sections.iter().map(|s| s.memory_type).collect(),
        sources: context.contributing_types(),
        total_results: context.total_results(),
        failed_types: context.failed_types,
        truncated: context.truncated,
        context: context.rendered,
        query: params.query,
        conversation_id: params.conversation_id,
    }))
}

#[derive(Serialize)]
struct MemoryHealthResponse {
    status: &'static str,
    enabled: bool,
    systems: BTreeMap<MemoryType, bool>,
}

async fn memory_health_handler(State(state): State<SharedState>) -> Json<MemoryHealthResponse> {
    let systems = state.memory.health_check().await;
    let status = if systems.values().all(|ok| *ok) {
        "healthy"
    } else {
        "degraded"
    };
    Json(MemoryHealthResponse {
        status,
        enabled: state.memory.config().enabled,
        systems,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────
