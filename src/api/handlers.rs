// src/api/handlers.rs

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::Value;

use crate::api::{auth, types::*, ApiState};
use crate::core::types::{PromptRequest, StatusReport};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "velle-sidecar",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /velle_prompt: same contract as the `velle_prompt` tool. Guardrail
/// refusals come back as 200 with an error body, like the tool result.
pub async fn prompt(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    auth::check_auth(&state, &headers)?;

    let Json(req) = body.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!("Invalid request body: {}", e.body_text()))),
        )
    })?;

    let result = match state.governor.prompt(req).await {
        Ok(dispatch) => serde_json::to_value(dispatch.into_ack()).unwrap_or_default(),
        Err(e) => e.to_json(),
    };
    Ok(Json(result))
}

/// GET /velle_status
pub async fn status(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<StatusReport>, ApiError> {
    auth::check_auth(&state, &headers)?;
    Ok(Json(state.governor.status().await))
}
