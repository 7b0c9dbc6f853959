//! Shared HTTP constants (headers, problem URIs, routes).

pub(crate) const HEADER_REQUEST_ID: &str = portcullis_telemetry::REQUEST_ID_HEADER;
pub(crate) const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub(crate) const ROUTE_PING: &str = "/health/v1/ping";
pub(crate) const ROUTE_HEALTH_FULL: &str = "/health/v1/full";
pub(crate) const ROUTE_METRICS: &str = "/metrics";
pub(crate) const ROUTE_PREAUTH: &str = "/gateway/{topology}/auth/api/v1/pre";
pub(crate) const ROUTE_UNMATCHED: &str = "unmatched";

pub(crate) const PROBLEM_INTERNAL: &str = "https://portcullis.dev/problems/internal";
pub(crate) const PROBLEM_UNAUTHORIZED: &str = "https://portcullis.dev/problems/unauthorized";
pub(crate) const PROBLEM_FORBIDDEN: &str = "https://portcullis.dev/problems/forbidden";
pub(crate) const PROBLEM_REJECTED: &str = "https://portcullis.dev/problems/rejected";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://portcullis.dev/problems/not-found";
pub(crate) const PROBLEM_SERVICE_UNAVAILABLE: &str =
    "https://portcullis.dev/problems/service-unavailable";
