//! Request counting per matched route and status code.
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use portcullis_telemetry::{Metrics, with_request_context};

use crate::http::constants::{HEADER_REQUEST_ID, ROUTE_UNMATCHED};

/// Route middleware: runs the handler inside the request's logging scope and
/// counts the response under the route template, so topology names in the
/// path do not multiply label sets.
pub(crate) async fn record_request(
    State(telemetry): State<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(ROUTE_UNMATCHED, MatchedPath::as_str)
        .to_owned();
    let request_id = request
        .headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_default();

    let response = with_request_context(request_id, route.clone(), next.run(request)).await;
    telemetry.inc_http_request(&route, response.status().as_u16());
    response
}
