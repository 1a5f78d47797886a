//! HTTP API for the sankey console
//!
//! # Endpoints
//!
//! - `POST /api/v0/console/sankey` - Build a flow graph
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics
//!
//! # Example
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v0/console/sankey \
//!   -H "Content-Type: application/json" \
//!   -d '{
//!     "start": "2022-04-10T15:45:10Z",
//!     "end": "2022-04-11T15:45:10Z",
//!     "dimensions": ["SrcAS", "InIfProvider", "ExporterName"],
//!     "limit": 10,
//!     "filter": "DstCountry = '\''FR'\''"
//!   }'
//! ```
//!
//! Errors are returned as `{"message": "..."}` with status 400 for invalid
//! requests, 502 when the store fails and 500 otherwise.

use crate::error::{Error, ErrorKind};
use crate::graph::SankeyGraph;
use crate::metrics;
use crate::query::SankeyRequest;
use crate::service::SankeyService;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared state for all handlers
pub struct AppState {
    /// Sankey pipeline
    pub service: SankeyService,
}

/// Health check body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` when the process answers
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable reason
    pub message: String,
}

/// Error returned by handlers
#[derive(Debug)]
pub enum ApiError {
    /// Body could not be decoded
    BadPayload(String),
    /// Pipeline failure
    Sankey(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Sankey(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadPayload(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadPayload(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Sankey(e) => {
                let status = match e.kind() {
                    ErrorKind::Client => StatusCode::BAD_REQUEST,
                    ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
                    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            },
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Build CORS layer from configured origins (empty = any)
fn build_cors_layer(cors_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if cors_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        layer.allow_origin(origins)
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .route("/api/v0/console/sankey", post(sankey))
        .with_state(state)
        .layer(build_cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus metrics endpoint
pub async fn prometheus_metrics() -> Response {
    match metrics::gather_metrics() {
        Ok(text) => (StatusCode::OK, [("content-type", "text/plain")], text).into_response(),
        Err(e) => ApiError::Sankey(e).into_response(),
    }
}

/// Build a flow graph
pub async fn sankey(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SankeyRequest>, JsonRejection>,
) -> Result<Json<SankeyGraph>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Undecodable sankey request");
        metrics::record_request("client_error");
        ApiError::from(rejection)
    })?;

    let graph = state.service.execute(request).await?;
    Ok(Json(graph))
}
