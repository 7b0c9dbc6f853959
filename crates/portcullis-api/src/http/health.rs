//! Health and diagnostics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use portcullis_telemetry::build_sha;
use tracing::error;

use crate::http::constants::METRICS_CONTENT_TYPE;
use crate::http::errors::ApiError;
use crate::models::{FullHealthResponse, HealthMetrics, PingResponse};
use crate::state::ApiState;

pub(crate) async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok".to_string(),
    })
}

pub(crate) async fn health_full(State(state): State<Arc<ApiState>>) -> Json<FullHealthResponse> {
    let snapshot = state.telemetry.snapshot();
    let degraded = state.degraded_components();
    let status = if degraded.is_empty() { "ok" } else { "degraded" };
    Json(FullHealthResponse {
        status: status.to_string(),
        build: build_sha().to_string(),
        degraded,
        topologies: state.topologies.names().map(str::to_string).collect(),
        metrics: HealthMetrics {
            remote_auth_latency_ms: snapshot.remote_auth_latency_ms,
            remote_auth_cache_hits_total: snapshot.remote_auth_cache_hits_total,
            topologies_configured: snapshot.topologies_configured,
        },
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(axum::http::header::CONTENT_TYPE, METRICS_CONTENT_TYPE)
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}

pub(crate) async fn not_found(uri: axum::http::Uri) -> ApiError {
    ApiError::not_found(format!("no route for {}", uri.path()))
}
