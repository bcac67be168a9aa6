//! HTTP API gateway for MedChat.
//!
//! Routes:
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/health` | service overview |
//! | POST | `/api/v1/chat` | medical chat |
//! | GET | `/api/v1/chat/health` | medical chat health |
//! | GET | `/api/v1/chat/sessions/{id}/context` | session summary |
//! | POST/GET | `/api/v1/patients` | create / list patients |
//! | GET/PUT/DELETE | `/api/v1/patients/{id}` | one patient |
//! | POST | `/api/chat` | agent chat |
//! | GET | `/api/chat/agents` | registered agents |
//! | GET | `/api/chat/providers` | provider status |
//! | GET | `/api/memory/context` | unified memory context |
//! | GET | `/api/memory/health` | memory store health |
//!
//! Built on Axum. Services are constructed once in [`AppState::from_config`]
//! and shared through `Arc`.

pub mod api;
pub mod api_v1;
pub mod error;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, Method, header};
use axum::response::Json;
use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use medchat_agent::{AgentDeps, AgentRegistry, ContextAggregator, MedicalChatService};
use medchat_config::{AppConfig, PROVIDER_PRIORITY};
use medchat_memory::MemoryManager;
use medchat_patients::{InMemoryPatientStore, PatientService};
use medchat_providers::{LlmService, ProviderManager, ProviderRouter, build_from_config};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::{ApiError, ApiJson, ApiQuery};

/// Shared services behind every handler.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub llm: Arc<LlmService>,
    pub providers: ProviderManager,
    pub memory: Arc<MemoryManager>,
    pub aggregator: Arc<ContextAggregator>,
    pub agents: AgentRegistry,
    pub medical: Arc<MedicalChatService>,
    pub patients: PatientService,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire every service from configuration with the in-process stores.
    pub fn from_config(config: AppConfig) -> Self {
        let router = Arc::new(build_from_config(&config));
        let memory = Arc::new(MemoryManager::from_config(&config.memory));
        Self::with_services(config, router, memory)
    }

    /// Wire the services around an existing provider router and memory.
    pub fn with_services(
        config: AppConfig,
        router: Arc<ProviderRouter>,
        memory: Arc<MemoryManager>,
    ) -> Self {
        let config = Arc::new(config);
        let llm = Arc::new(LlmService::new(router.clone(), config.clone()));
        let deps = AgentDeps::new(llm.clone(), memory.clone());
        let aggregator = deps.aggregator.clone();
        let providers = ProviderManager::new(router, Duration::from_secs(config.request_timeout_secs));
        let medical = Arc::new(MedicalChatService::new(llm.clone(), &config.medical));

        Self {
            providers,
            agents: AgentRegistry::with_builtins(deps),
            medical,
            patients: PatientService::new(Arc::new(InMemoryPatientStore::new())),
            aggregator,
            memory,
            llm,
            config,
            started_at: Utc::now(),
        }
    }
}

/// Build the full router.
///
/// Layers: request body limit, CORS from the configured origins, HTTP
/// trace logging.
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.gateway.cors_origins);
    let body_limit = state.config.gateway.max_body_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api_v1::router())
        .nest("/api", api::router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600));

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(parsed))
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(AppState::from_config(config));

    state.memory.initialize().await;
    info!(
        default_provider = %state.config.default_provider,
        configured = ?state.config.configured_providers(),
        agents = state.agents.len(),
        "Services initialized"
    );

    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.memory.close().await;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    version: &'static str,
    uptime_secs: i64,
    services: BTreeMap<&'static str, &'static str>,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let llm_ready = state.llm.select(None).is_ok();
    let memory = state.memory.health_check().await;
    let memory_ready = !state.config.memory.enabled || memory.values().any(|ok| *ok);

    let mut services = BTreeMap::from([
        ("api", "healthy"),
        ("llm_providers", if llm_ready { "healthy" } else { "unhealthy" }),
        ("memory", if memory_ready { "healthy" } else { "unhealthy" }),
    ]);
    for provider in PROVIDER_PRIORITY {
        let configured = if state.config.has_api_key(provider) {
            "configured"
        } else {
            "not_configured"
        };
        services.insert(provider, configured);
    }

    let status = if llm_ready && memory_ready {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        services,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn health_reports_services() {
        let state = test_state();
        let (status, body) = json_of(send(&state, "GET", "/health", None).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["services"]["openai"], "configured");
        assert_eq!(body["services"]["groq"], "not_configured");
        assert_eq!(body["services"]["api"], "healthy");
    }

    #[tokio::test]
    async fn health_is_degraded_without_llm() {
        let state = std::sync::Arc::new(super::AppState::from_config(Default::default()));
        let (status, body) = json_of(send(&state, "GET", "/health", None).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["services"]["llm_providers"], "unhealthy");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let state = test_state();
        let response = send(&state, "GET", "/nope", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
