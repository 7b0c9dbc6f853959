//! Error type for telemetry setup and metrics exposition.

use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Failures while installing logging or exposing metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber is already installed.
    #[error("tracing subscriber already installed")]
    LoggingInstall {
        /// Underlying subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A Prometheus collector could not be built or registered.
    #[error("metrics collector setup failed")]
    Collector {
        /// Metric name.
        name: &'static str,
        /// `build` or `register`.
        stage: &'static str,
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
    /// The registry could not be rendered in the text exposition format.
    #[error("metrics exposition failed")]
    Exposition {
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
}
