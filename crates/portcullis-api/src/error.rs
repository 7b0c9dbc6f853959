//! Failures of the HTTP host itself. Per-request failures are rendered as
//! problem documents by `http::errors` and never surface here.

use std::net::SocketAddr;

use thiserror::Error;

/// Result alias for API server operations.
pub type ApiServerResult<T> = std::result::Result<T, ApiServerError>;

/// Errors raised while building or running the gateway listener.
#[derive(Debug, Error)]
pub enum ApiServerError {
    /// `server.hsts` contains bytes that are not legal in a header.
    #[error("invalid hsts header value")]
    InvalidHsts {
        /// Rejected value.
        value: String,
    },
    /// The listener could not be bound.
    #[error("failed to bind api listener")]
    Bind {
        /// Requested socket address.
        addr: SocketAddr,
        /// Bind failure.
        source: std::io::Error,
    },
    /// `axum::serve` returned an error before shutdown was requested.
    #[error("api server terminated unexpectedly")]
    Serve {
        /// Accept loop failure.
        source: std::io::Error,
    },
}
