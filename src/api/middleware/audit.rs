//! Audit logging middleware.
//!
//! Logs every protected request with username, method, path and
//! response status. Runs innermost (after the session middleware
//! has injected `DoctorContext`).

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::DoctorContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let user = req
        .extensions()
        .get::<DoctorContext>()
        .map(|d| d.username.clone())
        .unwrap_or_else(|| "-".to_string());
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        target: "drscreen_lib::audit",
        %method,
        %path,
        status = response.status().as_u16(),
        %user,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "API access"
    );

    response
}
