//! # Design
//!
//! - Constant messages; cluster, alias, and path context lives in fields.
//! - IO and JSON failures name the operation that triggered them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for alias store operations.
pub type AliasResult<T> = Result<T, AliasError>;

/// Errors raised by the alias credential store.
#[derive(Debug, Error)]
pub enum AliasError {
    /// The alias already exists and overwriting was not requested.
    #[error("alias already exists")]
    AliasAlreadyExists {
        /// Cluster scope.
        cluster: String,
        /// Alias name.
        alias: String,
    },
    /// The alias does not exist in the cluster.
    #[error("alias not found")]
    AliasNotFound {
        /// Cluster scope.
        cluster: String,
        /// Alias name.
        alias: String,
    },
    /// A cluster or alias name failed validation.
    #[error("invalid name")]
    InvalidName {
        /// `cluster` or `alias`.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value.
        value: String,
    },
    /// A provided secret value was empty.
    #[error("alias value must not be empty")]
    EmptyValue {
        /// Alias name.
        alias: String,
    },
    /// No master secret was configured.
    #[error("master secret not configured")]
    MasterSecretMissing {
        /// Master file that was consulted.
        path: PathBuf,
    },
    /// A master file already exists and `force` was not set.
    #[error("master secret already exists")]
    MasterSecretExists {
        /// Existing master file.
        path: PathBuf,
    },
    /// A cluster file was sealed under a different master secret.
    #[error("master secret does not match stored credentials")]
    MasterSecretMismatch {
        /// Cluster whose verifier failed.
        cluster: String,
    },
    /// Sealing or opening a value failed.
    #[error("credential encryption failure")]
    Crypto {
        /// Operation that failed.
        operation: &'static str,
        /// Cluster involved.
        cluster: String,
    },
    /// Deriving the cluster key failed.
    #[error("credential key derivation failed")]
    KeyDerivation {
        /// Underlying argon2 error.
        detail: argon2::Error,
    },
    /// A stored record was not valid base64 or UTF-8.
    #[error("stored credential record is corrupt")]
    CorruptRecord {
        /// Cluster involved.
        cluster: String,
        /// Field that failed to decode.
        field: &'static str,
    },
    /// Filesystem failure.
    #[error("alias store io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// JSON encoding or decoding failure for a cluster file.
    #[error("alias store json failure")]
    Json {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

impl AliasError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Self::Json {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn crypto(operation: &'static str, cluster: &str) -> Self {
        Self::Crypto {
            operation,
            cluster: cluster.to_string(),
        }
    }

    pub(crate) fn corrupt(cluster: &str, field: &'static str) -> Self {
        Self::CorruptRecord {
            cluster: cluster.to_string(),
            field,
        }
    }
}
