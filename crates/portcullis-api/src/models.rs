//! Wire types returned by the gateway's HTTP endpoints.

use serde::{Deserialize, Serialize};

/// RFC9457-compatible problem document surfaced on every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
}

/// Body of `GET /health/v1/ping`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PingResponse {
    /// Always `ok` while the listener is up.
    pub status: String,
}

/// Body of `GET /health/v1/full`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FullHealthResponse {
    /// `ok`, or `degraded` when a component needs attention.
    pub status: String,
    /// Build revision of the running binary.
    pub build: String,
    /// Components reporting a problem.
    pub degraded: Vec<String>,
    /// Topologies the gateway serves.
    pub topologies: Vec<String>,
    /// Selected gauges and counters.
    pub metrics: HealthMetrics,
}

/// Metric values embedded in the full health report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthMetrics {
    /// Most recent remote preauth round trip.
    pub remote_auth_latency_ms: i64,
    /// Remote verdicts served from cache.
    pub remote_auth_cache_hits_total: u64,
    /// Topologies loaded at startup.
    pub topologies_configured: i64,
}
