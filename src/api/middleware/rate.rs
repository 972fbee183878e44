//! Per-client rate limiting middleware.
//!
//! Applies sliding-window rate limits per client:
//! - 100 requests per minute
//! - 1000 requests per hour
//!
//! A request carrying a live session token is counted against that session.
//! Anything else is counted against the peer address, or the last
//! `X-Forwarded-For` hop when the proxy is trusted.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::api::error::ApiError;
use crate::api::middleware::auth::session_token;
use crate::api::types::ApiContext;
use crate::session::hash_token;

/// Extract a rate-limit key from the request.
fn rate_key(req: &Request<axum::body::Body>, ctx: &ApiContext) -> Result<String, ApiError> {
    if let Some(token) = session_token(req.headers()) {
        if ctx.core.lock_sessions()?.is_active(&token) {
            let digest = hash_token(&token);
            return Ok(format!("session:{}", URL_SAFE_NO_PAD.encode(&digest[..12])));
        }
    }

    if ctx.core.config.trust_forwarded_for {
        let forwarded = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return Ok(format!("ip:{ip}"));
        }
    }

    // ConnectInfo is absent only when the router is driven in-process.
    Ok(req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(peer)| format!("ip:{}", peer.ip()))
        .unwrap_or_else(|| "anonymous".to_string()))
}

/// Per-client rate limiting. Returns 429 if exceeded.
/// Accesses `ApiContext` from request extensions.
pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(req: Request<axum::body::Body>, next: Next) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let key = rate_key(&req, &ctx)?;

    // MutexGuard is !Send, must drop before .await
    {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        if let Err(retry_after) = limiter.check(&key) {
            tracing::warn!(
                key = %key,
                clients = limiter.tracked_clients(),
                "Rate limit exceeded"
            );
            return Err(ApiError::RateLimited { retry_after });
        }
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;

    use crate::classifier::FixedClassifier;
    use crate::config::AppConfig;
    use crate::core_state::CoreState;

    fn context(dir: &std::path::Path, trust_forwarded_for: bool) -> ApiContext {
        let config = AppConfig {
            database_path: dir.join("users.db"),
            upload_dir: dir.join("uploads"),
            trust_forwarded_for,
            ..AppConfig::default()
        };
        ApiContext::new(Arc::new(CoreState::new(
            config,
            Arc::new(FixedClassifier::new(vec![1.0, 0.0, 0.0, 0.0, 0.0])),
        )))
    }

    fn from_peer(peer: [u8; 4], forwarded: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder();
        if let Some(xff) = forwarded {
            builder = builder.header("X-Forwarded-For", xff);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
        req
    }

    #[test]
    fn key_uses_peer_address() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path(), false);
        let key = rate_key(&from_peer([192, 0, 2, 7], None), &ctx).unwrap();
        assert_eq!(key, "ip:192.0.2.7");
    }

    #[test]
    fn forwarded_header_ignored_unless_trusted() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path(), false);
        let req = from_peer([192, 0, 2, 7], Some("203.0.113.9"));
        assert_eq!(rate_key(&req, &ctx).unwrap(), "ip:192.0.2.7");
    }

    #[test]
    fn trusted_proxy_uses_last_forwarded_hop() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path(), true);
        let req = from_peer([10, 0, 0, 2], Some("198.51.100.1, 203.0.113.9"));
        assert_eq!(rate_key(&req, &ctx).unwrap(), "ip:203.0.113.9");
    }

    #[test]
    fn live_session_gets_its_own_key() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path(), false);
        let token = ctx.core.lock_sessions().unwrap().create("amensah");

        let mut req = from_peer([192, 0, 2, 7], None);
        req.headers_mut()
            .insert("Authorization", format!("Bearer {token}").parse().unwrap());
        assert!(rate_key(&req, &ctx).unwrap().starts_with("session:"));

        let mut forged = from_peer([192, 0, 2, 7], None);
        forged
            .headers_mut()
            .insert("Authorization", "Bearer made-up".parse().unwrap());
        assert_eq!(rate_key(&forged, &ctx).unwrap(), "ip:192.0.2.7");
    }

    #[test]
    fn key_defaults_to_anonymous_without_peer() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path(), false);
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(rate_key(&req, &ctx).unwrap(), "anonymous");
    }
}
