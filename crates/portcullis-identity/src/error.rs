//! # Design
//!
//! - Constant messages; context lives in fields.
//! - `Rejection` pairs an error with the HTTP status the caller must see, so
//!   status semantics survive from the resolver to the response.

use std::io;
use std::path::PathBuf;

use argon2::password_hash::Error as PasswordHashError;
use http::StatusCode;
use thiserror::Error;

/// Result alias for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors raised while asserting, encoding, or resolving identities.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The actor-id header was absent or empty.
    #[error("identity header missing")]
    MissingIdentityHeader {
        /// Header that was expected.
        header: String,
    },
    /// Credentials were missing, malformed, or did not verify.
    #[error("authentication failed")]
    AuthenticationFailed {
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// The remote preauth endpoint could not be reached in time.
    #[error("remote authentication endpoint unreachable")]
    RemoteAuthUnreachable {
        /// Endpoint that was called.
        url: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },
    /// The remote preauth endpoint answered without a usable verdict.
    #[error("remote authentication endpoint failed")]
    RemoteAuthFailed {
        /// Endpoint that was called.
        url: String,
        /// Status the endpoint returned.
        status: u16,
    },
    /// The remote preauth endpoint URL could not be parsed.
    #[error("invalid remote authentication url")]
    InvalidRemoteUrl {
        /// Configured value.
        url: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
    /// A principal was empty.
    #[error("principal must not be empty")]
    EmptyPrincipal,
    /// A header name or value could not be represented on the wire.
    #[error("invalid header")]
    InvalidHeader {
        /// Header name (or prefix) involved.
        name: String,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// A mapping rule did not follow `names=targets;...`.
    #[error("invalid mapping rule")]
    InvalidMapping {
        /// Offending rule.
        rule: String,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// A topology could not be assembled from configuration.
    #[error("invalid topology configuration")]
    InvalidTopology {
        /// Topology name.
        topology: String,
        /// What was wrong with it.
        source: Box<IdentityError>,
    },
    /// Hashing or parsing a stored password hash failed.
    #[error("password hash operation failed")]
    PasswordHash {
        /// Underlying hashing error.
        detail: PasswordHashError,
    },
    /// Reading a CA bundle failed.
    #[error("failed to read trust store")]
    TrustStore {
        /// Path of the bundle.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Building the outbound HTTP client failed.
    #[error("failed to build http client")]
    HttpClient {
        /// Underlying client error.
        source: reqwest::Error,
    },
}

/// A resolver verdict that denies the request.
#[derive(Debug, Error)]
#[error("identity rejected")]
pub struct Rejection {
    /// Status the original caller receives.
    pub status: StatusCode,
    /// Cause of the rejection.
    #[source]
    pub cause: IdentityError,
}

impl Rejection {
    /// Reject with `401 Unauthorized`.
    #[must_use]
    pub const fn unauthorized(cause: IdentityError) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            cause,
        }
    }

    /// Reject with an explicit status.
    #[must_use]
    pub const fn with_status(status: StatusCode, cause: IdentityError) -> Self {
        Self { status, cause }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn rejection_exposes_cause_as_source() {
        let rejection = Rejection::unauthorized(IdentityError::AuthenticationFailed {
            reason: "bad_password",
        });
        assert_eq!(rejection.status, StatusCode::UNAUTHORIZED);
        assert_eq!(rejection.to_string(), "identity rejected");
        let source = rejection.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("authentication failed"));
    }

    #[test]
    fn error_messages_are_constant() {
        let cases = [
            (
                IdentityError::MissingIdentityHeader {
                    header: "x-knox-actor-id".into(),
                },
                "identity header missing",
            ),
            (
                IdentityError::RemoteAuthFailed {
                    url: "http://remote".into(),
                    status: 502,
                },
                "remote authentication endpoint failed",
            ),
            (IdentityError::EmptyPrincipal, "principal must not be empty"),
            (
                IdentityError::InvalidMapping {
                    rule: "a".into(),
                    reason: "missing_equals",
                },
                "invalid mapping rule",
            ),
            (
                IdentityError::TrustStore {
                    path: PathBuf::from("ca.pem"),
                    source: io::Error::other("io"),
                },
                "failed to read trust store",
            ),
        ];
        for (err, message) in cases {
            assert_eq!(err.to_string(), message);
        }
    }
}
