//! HTTP middleware: rate limiting and bearer token authentication.

use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::state::AppState;

/// Rate limiting middleware. Checks per-IP request rate before routing.
pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let ip = addr.ip();
    match state.rate_limiter.check(ip).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(%ip, retry_after, "rate limit exceeded");
            let body = serde_json::json!({
                "error": "rate limit exceeded",
                "retry_after": retry_after,
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
        }
    }
}

/// Authentication middleware.
///
/// Every request except `/health` must carry `Authorization: Bearer <token>`
/// or `X-API-Key: <token>` naming a configured principal. The resolved
/// [`actlog_core::Principal`] is stored in the request extensions for the
/// handlers. Failures are 403 and never reach a handler.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    // /health is exempt from auth (for load balancer health checks)
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let headers = request.headers();
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let api_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());

    let token = match bearer.or(api_key) {
        Some(t) => t.trim().to_string(),
        None => {
            tracing::debug!(path = %request.uri().path(), "request without credentials");
            return super::json_error(
                StatusCode::FORBIDDEN,
                "authentication credentials were not provided",
            )
            .into_response();
        }
    };

    let principal = match state.authenticate(&token) {
        Some(p) => p.clone(),
        None => {
            tracing::warn!(path = %request.uri().path(), "rejected unknown token");
            return super::json_error(StatusCode::FORBIDDEN, "invalid token").into_response();
        }
    };

    request.extensions_mut().insert(principal);
    next.run(request).await
}
