//! Error types for configuration loading and validation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration document failed.
    #[error("failed to read configuration")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path of the configuration document.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The configuration document was not valid YAML for the model.
    #[error("failed to parse configuration")]
    Parse {
        /// Path of the configuration document, when loaded from disk.
        path: Option<PathBuf>,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation (e.g. `topologies.sandbox.remote`).
        section: String,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// An environment override carried an unparseable value.
    #[error("invalid environment override")]
    InvalidEnv {
        /// Environment variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: impl Into<String>,
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section: section.into(),
            field,
            value,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_messages_are_constant() -> Result<(), Box<dyn Error>> {
        let Err(yaml_error) = serde_yaml::from_str::<u32>("not-a-number") else {
            return Err(io::Error::other("expected yaml error").into());
        };
        let cases = vec![
            (
                ConfigError::Io {
                    operation: "config.read",
                    path: PathBuf::from("gateway.yaml"),
                    source: io::Error::other("io"),
                },
                "failed to read configuration",
                true,
            ),
            (
                ConfigError::Parse {
                    path: None,
                    source: yaml_error,
                },
                "failed to parse configuration",
                true,
            ),
            (
                ConfigError::invalid("server", "http_port", Some("0".into()), "zero"),
                "invalid configuration field",
                false,
            ),
            (
                ConfigError::InvalidEnv {
                    name: "PORTCULLIS_HTTP_PORT",
                    value: "abc".into(),
                },
                "invalid environment override",
                false,
            ),
        ];
        for (err, message, has_source) in cases {
            assert_eq!(err.to_string(), message);
            assert_eq!(err.source().is_some(), has_source);
        }
        Ok(())
    }
}
