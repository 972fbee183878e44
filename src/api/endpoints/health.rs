//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Active classifier backend (`onnx` or `fixed`).
    pub classifier: String,
}

/// `GET /api/health`: liveness check, no session required.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        classifier: ctx.core.classifier().name().to_string(),
    })
}
