//! Router construction and server host for the gateway.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Request, header::STRICT_TRANSPORT_SECURITY},
    middleware,
    routing::get,
};
use portcullis_identity::TopologyRegistry;
use portcullis_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{Span, info};

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::{
    HEADER_REQUEST_ID, ROUTE_HEALTH_FULL, ROUTE_METRICS, ROUTE_PING, ROUTE_PREAUTH,
};
use crate::http::health::{health_full, metrics, not_found, ping};
use crate::http::preauth::preauth;
use crate::http::telemetry::record_request;
use crate::state::ApiState;

/// Axum router wrapper that hosts the gateway endpoints.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Wire the topologies and telemetry into the router.
    ///
    /// `hsts` is attached as `Strict-Transport-Security` to every response,
    /// including 404s for unknown paths.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::InvalidHsts`] when `hsts` is not a valid header value.
    pub fn new(topologies: TopologyRegistry, telemetry: Metrics, hsts: &str) -> ApiServerResult<Self> {
        let hsts_value = HeaderValue::from_str(hsts).map_err(|_| ApiServerError::InvalidHsts {
            value: hsts.to_string(),
        })?;
        let state = Arc::new(ApiState::new(topologies, telemetry.clone()));

        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let method = request.method().clone();
                let uri_path = request.uri().path();
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %method,
                    route = %uri_path,
                    request_id = %request_id,
                    topology = tracing::field::Empty,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(portcullis_telemetry::propagate_request_id_layer())
            .layer(portcullis_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(middleware::from_fn_with_state(telemetry, record_request));

        let router = Self::build_router()
            .fallback(not_found)
            .route_layer(layered)
            .layer(SetResponseHeaderLayer::overriding(
                STRICT_TRANSPORT_SECURITY,
                hsts_value,
            ))
            .with_state(state);

        Ok(Self { router })
    }

    fn build_router() -> Router<Arc<ApiState>> {
        Router::new()
            .route(ROUTE_PING, get(ping))
            .route(ROUTE_HEALTH_FULL, get(health_full))
            .route(ROUTE_METRICS, get(metrics))
            .route(ROUTE_PREAUTH, get(preauth))
    }

    /// Serve until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve_with_shutdown<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        info!(%addr, "gateway listening");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}
