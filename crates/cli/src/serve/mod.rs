//! `actlog serve` -- HTTP JSON API for activity records.
//!
//! Exposes [`actlog_service::ActivityService`] as an async HTTP service
//! using `axum` + `tokio`. Supports concurrent request handling.
//!
//! Security features:
//! - Bearer token authentication; every caller is a configured principal
//! - Ownership scoping: records of other principals answer 404
//! - CORS headers on all responses (permissive for local dev)
//! - Per-IP rate limiting (default: 60 req/min, configurable)
//!
//! Endpoints:
//! - GET    /health                   - Server status (exempt from auth)
//! - POST   /records                  - Create a record
//! - GET    /records                  - List the caller's records
//! - GET    /records/{id}             - Read one record
//! - PATCH  /records/{id}             - Update action/metadata
//! - DELETE /records/{id}             - Delete a record
//! - PATCH  /records/{id}/transition  - Change status
//!
//! Response bodies are JSON; errors carry an `error` field.

mod handlers;
mod middleware;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use actlog_service::ActivityService;
use actlog_storage::InMemoryRecordStore;

use crate::config::AppConfig;

use self::handlers::{
    handle_create_record, handle_delete_record, handle_get_record, handle_health,
    handle_list_records, handle_not_found, handle_transition_record, handle_update_record,
};
use self::middleware::{auth_middleware, rate_limit_middleware};
use self::state::{AppState, RateLimiter};

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build shared state over a fresh in-memory store.
fn build_state(config: &AppConfig) -> Arc<AppState> {
    let service = ActivityService::new(
        Arc::new(InMemoryRecordStore::new()),
        config.lifecycle.clone(),
    );
    Arc::new(AppState {
        service,
        rate_limiter: RateLimiter::new(config.server.rate_limit),
        tokens: config.token_table(),
    })
}

/// Assemble the router with all middleware layers.
fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/records",
            get(handle_list_records).post(handle_create_record),
        )
        .route(
            "/records/{id}",
            get(handle_get_record)
                .patch(handle_update_record)
                .delete(handle_delete_record),
        )
        .route("/records/{id}/transition", patch(handle_transition_record))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the given port.
///
/// When TLS cert/key paths are provided, the server listens over HTTPS
/// using `axum-server` with rustls. Otherwise it uses plain HTTP.
pub async fn start_server(
    config: AppConfig,
    port: u16,
    _tls_cert: Option<PathBuf>,
    _tls_key: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        principals = config.principals.len(),
        rate_limit = config.server.rate_limit,
        max_transition_attempts = config.lifecycle.max_transition_attempts,
        "starting actlog server"
    );

    let state = build_state(&config);
    let app = build_router(state, config.server.max_body_bytes);

    let addr = format!("0.0.0.0:{}", port);

    // TLS support via axum-server + rustls (requires `tls` feature)
    #[cfg(feature = "tls")]
    if let (Some(cert_path), Some(key_path)) = (&_tls_cert, &_tls_key) {
        let tls =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
        let socket_addr: std::net::SocketAddr = addr.parse()?;
        tracing::info!("actlog listening on https://{}", addr);

        let handle = axum_server::Handle::new();
        let shutdown = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
        });

        axum_server::bind_rustls(socket_addr, tls)
            .handle(handle)
            .serve(app.into_make_service_with_connect_info::<std::net::SocketAddr>())
            .await?;
        tracing::info!("server shut down");
        return Ok(());
    }

    #[cfg(not(feature = "tls"))]
    if _tls_cert.is_some() || _tls_key.is_some() {
        return Err("TLS requested but this build lacks the `tls` feature".into());
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("actlog listening on http://{}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received shutdown signal"),
        Err(e) => {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
