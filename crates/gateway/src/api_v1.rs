//! `/api/v1`: medical chat and patient records.
//!
//! - `POST /api/v1/chat`: medical question, answered in es|en
//! - `GET  /api/v1/chat/health`: medical chat health
//! - `GET  /api/v1/chat/sessions/{id}/context`: session summary
//! - `POST /api/v1/patients`: register a patient
//! - `GET  /api/v1/patients`: list patients (`skip`, `limit`)
//! - `GET|PUT|DELETE /api/v1/patients/{id}`: one patient

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use medchat_agent::medical::{
    KnowledgeStats, MedicalChatRequest, MedicalHealth, MedicalReply, SessionSummary,
};
use medchat_core::patient::{Patient, PatientCreate, PatientUpdate};
use medchat_patients::DEFAULT_PAGE_LIMIT;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::SharedState;
use crate::error::{ApiError, ApiJson, ApiQuery};

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 router. Nest this under "/api/v1".
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/chat", post(medical_chat_handler))
        .route("/chat/health", get(medical_health_handler))
        .route("/chat/sessions/{id}/context", get(session_context_handler))
        .route(
            "/patients",
            post(create_patient_handler).get(list_patients_handler),
        )
        .route(
            "/patients/{id}",
            get(get_patient_handler)
                .put(update_patient_handler)
                .delete(delete_patient_handler),
        )
}

// ── Medical chat ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MedicalChatHealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    version: &'static str,
    services: MedicalHealth,
    knowledge_base: KnowledgeStats,
}

/// The body returned when the chat service itself breaks down.
fn medical_unavailable() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "detail": {
                "error": "Medical chat service unavailable",
                "message": "Unable to process medical query at this time",
                "timestamp": Utc::now(),
            }
        })),
    )
        .into_response()
}

async fn medical_chat_handler(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<MedicalChatRequest>,
) -> Result<Json<MedicalReply>, Response> {
    let medical = state.medical.clone();
    match tokio::spawn(async move { medical.chat(request).await }).await {
        Ok(Ok(reply)) => Ok(Json(reply)),
        Ok(Err(invalid)) => Err(ApiError::from(invalid).into_response()),
        Err(e) => {
            error!(error = %e, "Medical chat task failed");
            Err(medical_unavailable())
        }
    }
}

async fn medical_health_handler(
    State(state): State<SharedState>,
) -> Json<MedicalChatHealthResponse> {
    let services = state.medical.health().await;
    let status = if services.llm_configured && services.knowledge_base_loaded {
        "healthy"
    } else {
        "degraded"
    };
    Json(MedicalChatHealthResponse {
        status,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        knowledge_base: state.medical.knowledge().stats(),
        services,
    })
}

async fn session_context_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    state
        .medical
        .session_context(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Session not found"))
}

// ── Patients ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListParams {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

async fn create_patient_handler(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<PatientCreate>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let patient = state.patients.create(request).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

async fn list_patients_handler(
    State(state): State<SharedState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(state.patients.list(params.skip, params.limit).await?))
}

async fn get_patient_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.patients.get(&id).await?))
}

async fn update_patient_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<PatientUpdate>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.patients.update(&id, update).await?))
}

async fn delete_patient_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.patients.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;
    use medchat_core::error::ProviderError;
    use serde_json::json;

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let state = test_state();
        let (status, body) = json_of(
            send(&state, "POST", "/api/v1/chat", Some(json!({"message": "   "}))).await,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("message"));
    }

    #[tokio::test]
    async fn overlong_message_is_rejected() {
        let state = test_state();
        let message = "a".repeat(1001);
        let response = send(
            &state,
            "POST",
            "/api/v1/chat",
            Some(json!({"message": message})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unsupported_language_is_rejected() {
        let state = test_state();
        let response = send(
            &state,
            "POST",
            "/api/v1/chat",
            Some(json!({"message": "Bonjour", "language": "fr"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_message_field_is_rejected() {
        let state = test_state();
        let (status, body) =
            json_of(send(&state, "POST", "/api/v1/chat", Some(json!({"language": "es"}))).await)
                .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn spanish_question_is_answered() {
        let state = test_state();
        let (status, body) = json_of(
            send(
                &state,
                "POST",
                "/api/v1/chat",
                Some(json!({"message": "¿Qué es Ozempic?", "language": "es"})),
            )
            .await,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "es");
        assert_eq!(body["message"], "Mock medical answer");
        assert_eq!(body["context_preserved"], true);
        assert!(!body["medical_disclaimer"].as_str().unwrap().is_empty());
        assert!(body["session_id"].is_string());
        assert!(body["response_time_ms"].is_u64());
    }

    #[tokio::test]
    async fn llm_failure_still_answers_with_fallback() {
        let state = state_with(Err(ProviderError::Network("down".into())));
        let (status, body) = json_of(
            send(
                &state,
                "POST",
                "/api/v1/chat",
                Some(json!({"message": "Help", "language": "en"})),
            )
            .await,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["context_preserved"], false);
        assert!(body["message"].as_str().unwrap().starts_with("I'm sorry"));
    }

    #[tokio::test]
    async fn session_context_roundtrip() {
        let state = test_state();
        let (_, reply) = json_of(
            send(
                &state,
                "POST",
                "/api/v1/chat",
                Some(json!({"message": "Hola", "session_id": "sess-1", "patient_id": "p-1"})),
            )
            .await,
        )
        .await;
        assert_eq!(reply["session_id"], "sess-1");

        let (status, body) = json_of(
            send(&state, "GET", "/api/v1/chat/sessions/sess-1/context", None).await,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message_count"], 2);
        assert_eq!(body["language"], "es");
        assert_eq!(body["patient_id"], "p-1");

        let response = send(&state, "GET", "/api/v1/chat/sessions/nope/context", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn medical_health_reports_knowledge() {
        let state = test_state();
        let (status, body) =
            json_of(send(&state, "GET", "/api/v1/chat/health", None).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["services"]["knowledge_base_loaded"], true);
        assert_eq!(body["knowledge_base"]["spanish_items"], 8);
    }

    fn maria(id: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "name": "Maria Rodriguez",
            "age": 45,
            "gender": "female",
            "height_cm": 165.5,
            "initial_weight_kg": 85.2,
            "medical_history": [{"condition": "Type 2 Diabetes"}]
        })
    }

    #[tokio::test]
    async fn patient_crud_statuses() {
        let state = test_state();

        let (status, created) =
            json_of(send(&state, "POST", "/api/v1/patients", Some(maria("p-1"))).await).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["_id"], "p-1");
        assert_eq!(created["treatment_phase"], "pre_treatment");

        let (status, body) =
            json_of(send(&state, "POST", "/api/v1/patients", Some(maria("p-1"))).await).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["detail"].as_str().unwrap().contains("already exists"));

        let (status, updated) = json_of(
            send(
                &state,
                "PUT",
                "/api/v1/patients/p-1",
                Some(json!({"current_weight_kg": 80.0})),
            )
            .await,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["current_weight_kg"], 80.0);
        assert_eq!(updated["name"], "Maria Rodriguez");

        let response = send(&state, "DELETE", "/api/v1/patients/p-1", None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let (status, body) =
            json_of(send(&state, "GET", "/api/v1/patients/p-1", None).await).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Patient not found");

        let response = send(&state, "DELETE", "/api/v1/patients/p-1", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_patient_is_unprocessable() {
        let state = test_state();
        let mut bad = maria("p-2");
        bad["age"] = json!(200);
        let response = send(&state, "POST", "/api/v1/patients", Some(bad)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn list_patients_pages() {
        let state = test_state();
        for i in 0..3 {
            send(
                &state,
                "POST",
                "/api/v1/patients",
                Some(maria(&format!("p-{i}"))),
            )
            .await;
        }

        let (status, body) =
            json_of(send(&state, "GET", "/api/v1/patients?skip=1&limit=1", None).await).await;
        assert_eq!(status, StatusCode::OK);
        let page = body.as_array().unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["_id"], "p-1");

        let (_, body) = json_of(send(&state, "GET", "/api/v1/patients", None).await).await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let response = send(&state, "GET", "/api/v1/patients?limit=abc", None).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
