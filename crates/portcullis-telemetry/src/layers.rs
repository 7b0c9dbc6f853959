//! `x-request-id` assignment and echo for tower stacks.

use http::HeaderName;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the request identifier in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn request_id_header() -> HeaderName {
    HeaderName::from_static(REQUEST_ID_HEADER)
}

/// Assigns a UUID request id when the caller did not send one.
#[must_use]
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(request_id_header(), MakeRequestUuid)
}

/// Echoes the request id on the response.
#[must_use]
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(request_id_header())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Request, Response};
    use std::convert::Infallible;
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    async fn round_trip(request: Request<()>) -> Result<Option<String>, Infallible> {
        let service = ServiceBuilder::new()
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .service(service_fn(|_req: Request<()>| async {
                Ok::<_, Infallible>(Response::new(()))
            }));
        let response = service.oneshot(request).await?;
        Ok(response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string))
    }

    #[tokio::test]
    async fn missing_ids_are_generated_and_echoed() -> Result<(), Infallible> {
        let echoed = round_trip(Request::new(())).await?;
        assert!(echoed.is_some_and(|id| id.len() == 36));
        Ok(())
    }

    #[tokio::test]
    async fn caller_ids_are_kept() -> Result<(), Box<dyn std::error::Error>> {
        let request = Request::builder()
            .header(REQUEST_ID_HEADER, "req-42")
            .body(())?;
        assert_eq!(round_trip(request).await?.as_deref(), Some("req-42"));
        Ok(())
    }
}
