//! Local development HTTP server
//!
//! Thin axum boundary around the workflow orchestrator: request
//! validation maps to 400 with field errors, internal failures map to a
//! generic 500, and every response carries an X-Request-Id header.
//! Allowed CORS origins come from the ALLOWED_ORIGINS env var
//! (comma-separated; unset or `*` is permissive).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use uuid::Uuid;

use crate::api::ExperimentRequest;
use crate::errors::{RagError, Result};
use crate::workflow::WorkflowOrchestrator;

/// Version reported by /health
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<WorkflowOrchestrator>,
}

/// Build the application router
pub fn router(orchestrator: Arc<WorkflowOrchestrator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/run", post(run_experiment))
        .layer(cors_layer())
        .with_state(AppState { orchestrator })
}

/// Bind and serve until the process is stopped
pub async fn serve(
    orchestrator: Arc<WorkflowOrchestrator>,
    host: &str,
    port: u16,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| RagError::ConfigError(format!("Invalid address: {}", e)))?;

    let app = router(orchestrator);

    tracing::info!(event = "server_start", addr = %addr, version = SERVER_VERSION);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn cors_layer() -> CorsLayer {
    let raw = std::env::var("ALLOWED_ORIGINS").unwrap_or_default();
    let raw = raw.trim();

    if raw.is_empty() || raw == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = raw
        .split(',')
        .filter_map(|o| o.trim().parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "version": SERVER_VERSION}))
}

async fn run_experiment(
    State(state): State<AppState>,
    Json(request): Json<ExperimentRequest>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();

    tracing::info!(
        event = "request_received",
        request_id = %request_id,
        path = "/api/run",
    );

    if let Err(e) = request.validate() {
        tracing::warn!(
            event = "validation_error",
            request_id = %request_id,
            error = %e,
        );
        return error_response(StatusCode::BAD_REQUEST, &e.to_string(), &request_id);
    }

    match state
        .orchestrator
        .run(&request, Some(request_id.clone()))
        .await
    {
        Ok(response) => (
            StatusCode::OK,
            [("x-request-id", request_id)],
            Json(response),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(
                event = "internal_error",
                request_id = %request_id,
                error = %e,
            );
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &request_id,
            )
        }
    }
}

fn error_response(status: StatusCode, message: &str, request_id: &str) -> Response {
    (
        status,
        [("x-request-id", request_id.to_string())],
        Json(json!({"error": message, "request_id": request_id})),
    )
        .into_response()
}
