// HTTP request handlers
use crate::application::agent_gateway::SideEffect;
use crate::application::conversation::{DispatchOutcome, QueryOutcome};
use crate::domain::chat::AnalysisResponse;
use crate::infrastructure::chunked_json::stream_from_watch;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct ChatReply {
    pub answered: bool,
    pub response: Option<AnalysisResponse>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current session snapshot
pub async fn get_session(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let snapshot = state.session.snapshot();
    match json_response(StatusCode::OK, &snapshot, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Push a snapshot after every session change
pub async fn stream_session(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    stream_from_watch(state.session.subscribe(), accepts_brotli(&headers))
}

/// Ask the analysis agent; the answer (or failure notice) lands in the message log
pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let context = state.session.latest_sample();
    match state
        .orchestrator
        .post_user_query(&request.text, &context)
        .await
    {
        Ok(QueryOutcome::Answered(response)) => Json(ChatReply {
            answered: true,
            response: Some(response),
        })
        .into_response(),
        Ok(QueryOutcome::Failed) => Json(ChatReply {
            answered: false,
            response: None,
        })
        .into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

pub async fn post_voice_assist(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let outcome = state
        .orchestrator
        .dispatch_side_effect(SideEffect::VoiceAssist)
        .await;
    Json(json!({ "dispatched": outcome == DispatchOutcome::Dispatched }))
}

pub async fn post_clear_alert(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = state.evaluator.clear();
    Json(json!({ "cleared": cleared, "alert": state.session.alert() }))
}

/// Service history for the configured vehicle
pub async fn own_service_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.vehicle_registration.clone() {
        Some(registration) => service_history(Path(registration), State(state))
            .await
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no vehicle registration configured" })),
        )
            .into_response(),
    }
}

pub async fn service_history(
    Path(registration): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.gateway.service_history(&registration).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            tracing::error!("Error fetching service history for {}: {:#}", registration, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "service history unavailable" })),
            )
                .into_response()
        }
    }
}
