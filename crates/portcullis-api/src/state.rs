//! Shared state handed to every handler.

use portcullis_identity::TopologyRegistry;
use portcullis_telemetry::Metrics;

pub(crate) struct ApiState {
    pub(crate) topologies: TopologyRegistry,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    pub(crate) const fn new(topologies: TopologyRegistry, telemetry: Metrics) -> Self {
        Self {
            topologies,
            telemetry,
        }
    }

    /// Components that keep the gateway from doing useful work.
    pub(crate) fn degraded_components(&self) -> Vec<String> {
        if self.topologies.is_empty() {
            vec!["topologies".to_string()]
        } else {
            Vec::new()
        }
    }
}
