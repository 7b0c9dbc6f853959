//! Gateway counters and gauges on a private Prometheus registry.
//!
//! Series: HTTP traffic by route template, identity resolutions by resolver
//! mode, remote delegation latency and cache hits, alias store operations.

use std::sync::Arc;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Cheap-to-clone handle on the gateway registry.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    identity_resolutions_total: IntCounterVec,
    alias_operations_total: IntCounterVec,
    remote_auth_latency_ms: IntGauge,
    remote_auth_cache_hits_total: IntCounter,
    topologies_configured: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Latest observed round trip to a remote preauth endpoint (ms).
    pub remote_auth_latency_ms: i64,
    /// Remote verdicts served from the authentication cache.
    pub remote_auth_cache_hits_total: u64,
    /// Number of topologies loaded at startup.
    pub topologies_configured: i64,
}

impl Metrics {
    /// Build the registry with every gateway collector registered.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Collector`] naming the first collector that
    /// could not be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let add = Registrar(&registry);

        let http_requests_total = add.collector(
            "http_requests_total",
            IntCounterVec::new(
                Opts::new("http_requests_total", "Total HTTP requests received"),
                &["route", "code"],
            ),
        )?;
        let identity_resolutions_total = add.collector(
            "identity_resolutions_total",
            IntCounterVec::new(
                Opts::new(
                    "identity_resolutions_total",
                    "Identity resolutions by resolver mode and outcome",
                ),
                &["mode", "outcome"],
            ),
        )?;
        let alias_operations_total = add.collector(
            "alias_operations_total",
            IntCounterVec::new(
                Opts::new(
                    "alias_operations_total",
                    "Alias store operations by kind and outcome",
                ),
                &["operation", "outcome"],
            ),
        )?;
        let remote_auth_latency_ms = add.collector(
            "remote_auth_latency_ms",
            IntGauge::new(
                "remote_auth_latency_ms",
                "Latency of the most recent remote preauth call (ms)",
            ),
        )?;
        let remote_auth_cache_hits_total = add.collector(
            "remote_auth_cache_hits_total",
            IntCounter::new(
                "remote_auth_cache_hits_total",
                "Remote preauth verdicts served from cache",
            ),
        )?;
        let topologies_configured = add.collector(
            "topologies_configured",
            IntGauge::new("topologies_configured", "Topologies loaded at startup"),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                identity_resolutions_total,
                alias_operations_total,
                remote_auth_latency_ms,
                remote_auth_cache_hits_total,
                topologies_configured,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, code.as_str()])
            .inc();
    }

    /// Count an identity resolution (`mode` is `local` or `remote`).
    pub fn inc_identity_resolution(&self, mode: &str, outcome: &str) {
        self.inner
            .identity_resolutions_total
            .with_label_values(&[mode, outcome])
            .inc();
    }

    /// Count an alias store operation.
    pub fn inc_alias_operation(&self, operation: &str, outcome: &str) {
        self.inner
            .alias_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Record the latency of a remote preauth round trip.
    pub fn observe_remote_auth_latency(&self, duration: Duration) {
        self.inner
            .remote_auth_latency_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Count a remote verdict served from the authentication cache.
    pub fn inc_remote_auth_cache_hit(&self) {
        self.inner.remote_auth_cache_hits_total.inc();
    }

    /// Set the number of configured topologies.
    pub fn set_topologies_configured(&self, count: usize) {
        self.inner
            .topologies_configured
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render every registered series in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Exposition`] if encoding fails.
    pub fn render(&self) -> Result<String> {
        TextEncoder::new()
            .encode_to_string(&self.inner.registry.gather())
            .map_err(|source| TelemetryError::Exposition { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            remote_auth_latency_ms: self.inner.remote_auth_latency_ms.get(),
            remote_auth_cache_hits_total: self.inner.remote_auth_cache_hits_total.get(),
            topologies_configured: self.inner.topologies_configured.get(),
        }
    }

    fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Builds and registers collectors against one registry.
struct Registrar<'a>(&'a Registry);

impl Registrar<'_> {
    fn collector<C>(&self, name: &'static str, built: prometheus::Result<C>) -> Result<C>
    where
        C: Collector + Clone + 'static,
    {
        let collector = built.map_err(|source| TelemetryError::Collector {
            name,
            stage: "build",
            source,
        })?;
        self.0
            .register(Box::new(collector.clone()))
            .map_err(|source| TelemetryError::Collector {
                name,
                stage: "register",
                source,
            })?;
        Ok(collector)
    }
}
