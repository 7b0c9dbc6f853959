//! # Design
//!
//! - One error type covers every step from config load to the final store flush.
//! - Messages name the subsystem; the failing step travels in `operation`.
//! - Sources are chained, not logged, so `main` reports each failure once.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Boot step that failed.
        operation: &'static str,
        /// Source configuration error.
        source: portcullis_config::ConfigError,
    },
    /// Building the topology registry failed.
    #[error("identity topology setup failed")]
    Identity {
        /// Boot step that failed.
        operation: &'static str,
        /// Source identity error.
        source: portcullis_identity::IdentityError,
    },
    /// Alias store operations failed.
    #[error("alias store operation failed")]
    Aliases {
        /// Boot step that failed.
        operation: &'static str,
        /// Source alias store error.
        source: portcullis_aliases::AliasError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Boot step that failed.
        operation: &'static str,
        /// Source API server error.
        source: portcullis_api::ApiServerError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Boot step that failed.
        operation: &'static str,
        /// Source telemetry error.
        source: portcullis_telemetry::TelemetryError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: portcullis_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn identity(
        operation: &'static str,
        source: portcullis_identity::IdentityError,
    ) -> Self {
        Self::Identity { operation, source }
    }

    pub(crate) const fn aliases(
        operation: &'static str,
        source: portcullis_aliases::AliasError,
    ) -> Self {
        Self::Aliases { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: portcullis_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: portcullis_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }
}
