//! Loads the gateway document from disk and applies environment overrides.
//!
//! # Design
//! - The document path comes from the caller or `PORTCULLIS_CONFIG`; a missing
//!   path yields the built-in defaults.
//! - Environment lookups are injected so tests never touch process state.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::defaults::ENV_CONFIG_PATH;
use crate::error::{ConfigError, ConfigResult};
use crate::model::GatewayConfig;
use crate::validate::validate_config;

/// Environment variable overriding `server.bind_addr`.
pub const ENV_BIND_ADDR: &str = "PORTCULLIS_BIND_ADDR";
/// Environment variable overriding `server.http_port`.
pub const ENV_HTTP_PORT: &str = "PORTCULLIS_HTTP_PORT";
/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "PORTCULLIS_LOG_LEVEL";
/// Environment variable overriding `logging.format`.
pub const ENV_LOG_FORMAT: &str = "PORTCULLIS_LOG_FORMAT";
/// Environment variable overriding `aliases.store_dir`.
pub const ENV_ALIAS_STORE_DIR: &str = "PORTCULLIS_ALIAS_STORE_DIR";

/// Resolve the configuration path from an explicit argument or the environment.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from))
}

/// Load, override, and validate the gateway configuration.
///
/// # Errors
///
/// Returns an error when the document cannot be read or parsed, an override is
/// malformed, or validation fails.
pub fn load_config(path: Option<&Path>) -> ConfigResult<GatewayConfig> {
    let mut config = match resolve_config_path(path) {
        Some(path) => read_document(&path)?,
        None => {
            info!("no configuration document supplied; using defaults");
            GatewayConfig::default()
        }
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Read and parse a YAML document without applying overrides.
///
/// # Errors
///
/// Returns an error when the file cannot be read or is not valid YAML.
pub fn read_document(path: &Path) -> ConfigResult<GatewayConfig> {
    debug!(path = %path.display(), "reading gateway configuration");
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&raw).map_err(|err| match err {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        },
        other => other,
    })
}

/// Parse a YAML document held in memory.
///
/// # Errors
///
/// Returns an error when the text is not a valid gateway document.
pub fn parse_document(raw: &str) -> ConfigResult<GatewayConfig> {
    if raw.trim().is_empty() {
        return Ok(GatewayConfig::default());
    }
    serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse { path: None, source })
}

/// Apply `PORTCULLIS_*` overrides using the supplied lookup.
///
/// # Errors
///
/// Returns an error when an override cannot be parsed.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_BIND_ADDR) {
        config.server.bind_addr =
            value
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_BIND_ADDR,
                    value,
                })?;
    }
    if let Some(value) = lookup(ENV_HTTP_PORT) {
        config.server.http_port =
            value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_HTTP_PORT,
                    value,
                })?;
    }
    if let Some(value) = lookup(ENV_LOG_LEVEL) {
        config.logging.level = value;
    }
    if let Some(value) = lookup(ENV_LOG_FORMAT) {
        config.logging.format = Some(value);
    }
    if let Some(value) = lookup(ENV_ALIAS_STORE_DIR) {
        config.aliases.store_dir = PathBuf::from(value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FailMode, IdentitySource};
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r#"
server:
  http_port: 9443
users:
  - name: guest
    password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaA"
topologies:
  sandbox:
    headers:
      actor_id: x-knox-actor-username
      groups_prefix: x-knox-actor-groups
    identity:
      mode: local
      group_mapping: "*=users"
  delegated:
    identity:
      mode: remote
      url: "http://127.0.0.1:9000/gateway/sandbox/auth/api/v1/pre"
      fail_mode: unavailable
      cache_ttl_secs: 60
"#;

    #[test]
    fn parse_document_reads_topologies() -> ConfigResult<()> {
        let config = parse_document(SAMPLE)?;
        assert_eq!(config.server.http_port, 9443);
        assert_eq!(config.users.len(), 1);
        let sandbox = &config.topologies["sandbox"];
        assert_eq!(sandbox.headers.actor_id, "x-knox-actor-username");
        assert!(matches!(sandbox.identity, IdentitySource::Local(_)));
        let IdentitySource::Remote(remote) = &config.topologies["delegated"].identity else {
            panic!("expected remote identity source");
        };
        assert_eq!(remote.fail_mode, FailMode::Unavailable);
        assert_eq!(remote.cache_ttl_secs, Some(60));
        assert_eq!(remote.timeout_secs, 30);
        assert_eq!(remote.user_header, "X-Knox-Actor-ID");
        Ok(())
    }

    #[test]
    fn parse_document_rejects_unknown_fields() {
        let err = parse_document("server:\n  http_prot: 1\n");
        assert!(matches!(err, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn empty_document_yields_defaults() -> ConfigResult<()> {
        let config = parse_document("   \n")?;
        assert!(config.topologies.is_empty());
        assert_eq!(config.server.http_port, 8443);
        Ok(())
    }

    #[test]
    fn env_overrides_replace_document_values() -> ConfigResult<()> {
        let mut config = parse_document(SAMPLE)?;
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BIND_ADDR, "0.0.0.0"),
            (ENV_HTTP_PORT, "7443"),
            (ENV_LOG_FORMAT, "json"),
            (ENV_ALIAS_STORE_DIR, "/var/lib/portcullis"),
        ]);
        apply_env_overrides(&mut config, |name| env.get(name).map(ToString::to_string))?;
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0");
        assert_eq!(config.server.http_port, 7443);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert_eq!(
            config.aliases.store_dir,
            PathBuf::from("/var/lib/portcullis")
        );
        Ok(())
    }

    #[test]
    fn malformed_env_override_is_reported() {
        let mut config = GatewayConfig::default();
        let err = apply_env_overrides(&mut config, |name| {
            (name == ENV_HTTP_PORT).then(|| "eighty".to_string())
        });
        assert!(matches!(
            err,
            Err(ConfigError::InvalidEnv {
                name: ENV_HTTP_PORT,
                ..
            })
        ));
    }

    #[test]
    fn read_document_reports_path_on_failure() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"topologies: [not, a, map]\n")?;
        let err = read_document(file.path());
        match err {
            Err(ConfigError::Parse { path: Some(path), .. }) => assert_eq!(path, file.path()),
            other => panic!("unexpected result: {other:?}"),
        }

        let missing = read_document(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
        Ok(())
    }
}
