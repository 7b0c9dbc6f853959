//! `GET /gateway/{topology}/auth/api/v1/pre`: assert the caller's identity as headers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use portcullis_identity::InboundCredentials;
use portcullis_telemetry::record_topology;
use tracing::{info, warn};

use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::errors::ApiError;
use crate::state::ApiState;

/// Authenticate against the topology's resolver and answer `200` with the
/// asserted identity headers and an empty body.
pub(crate) async fn preauth(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Some(topology) = state.topologies.get(&name) else {
        return Err(ApiError::not_found(format!(
            "topology '{name}' is not configured"
        )));
    };
    record_topology(topology.name());
    let mode = topology.mode();

    let request_id = headers
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let mut credentials = InboundCredentials::new(headers);
    if let Some(request_id) = request_id {
        credentials = credentials.with_request_id(request_id);
    }

    let asserted = topology
        .resolve(&credentials)
        .await
        .and_then(|identity| {
            topology
                .assert_headers(&identity)
                .map(|headers| (identity, headers))
        });
    match asserted {
        Ok((identity, headers)) => {
            state
                .telemetry
                .inc_identity_resolution(mode, "authenticated");
            info!(
                topology = topology.name(),
                mode,
                principal = %identity.principal,
                groups = identity.groups.len(),
                "identity asserted"
            );
            let mut response = StatusCode::OK.into_response();
            response.headers_mut().extend(headers);
            Ok(response)
        }
        Err(rejection) => {
            let outcome = if rejection.status.is_server_error() {
                "error"
            } else {
                "rejected"
            };
            state.telemetry.inc_identity_resolution(mode, outcome);
            warn!(
                topology = topology.name(),
                mode,
                status = rejection.status.as_u16(),
                error = %rejection.cause,
                "identity rejected"
            );
            Err(ApiError::from_rejection(topology.name(), &rejection))
        }
    }
}
