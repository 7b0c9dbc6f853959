//! Validation of a parsed gateway document.

use std::collections::HashSet;

use http::{HeaderName, HeaderValue};
use regex::Regex;
use tracing::warn;
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{GatewayConfig, HeaderNaming, IdentitySource, RemoteIdentityConfig};

/// Validate every section of the document.
///
/// # Errors
///
/// Returns the first invalid field encountered.
pub fn validate_config(config: &GatewayConfig) -> ConfigResult<()> {
    if config.server.http_port == 0 {
        return Err(ConfigError::invalid(
            "server",
            "http_port",
            Some("0".to_string()),
            "zero",
        ));
    }
    if config.server.hsts.trim().is_empty() || HeaderValue::from_str(&config.server.hsts).is_err()
    {
        return Err(ConfigError::invalid(
            "server",
            "hsts",
            Some(config.server.hsts.clone()),
            "invalid_header_value",
        ));
    }

    let mut seen = HashSet::new();
    for user in &config.users {
        if user.name.trim().is_empty() {
            return Err(ConfigError::invalid("users", "name", None, "empty"));
        }
        if !seen.insert(user.name.as_str()) {
            return Err(ConfigError::invalid(
                "users",
                "name",
                Some(user.name.clone()),
                "duplicate",
            ));
        }
        if !user.password_hash.starts_with("$argon2") {
            return Err(ConfigError::invalid(
                format!("users.{}", user.name),
                "password_hash",
                None,
                "not_argon2_phc",
            ));
        }
    }

    if config.topologies.is_empty() {
        warn!("no topologies configured; only health and metrics endpoints will respond");
    }
    for (name, topology) in &config.topologies {
        if !is_valid_topology_name(name) {
            return Err(ConfigError::invalid(
                "topologies",
                "name",
                Some(name.clone()),
                "invalid_characters",
            ));
        }
        let section = format!("topologies.{name}");
        validate_naming(&section, &topology.headers)?;
        if let IdentitySource::Remote(remote) = &topology.identity {
            validate_remote(&format!("{section}.identity"), remote)?;
        }
    }
    Ok(())
}

/// Topology names appear in URL paths.
#[must_use]
pub fn is_valid_topology_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

fn validate_naming(section: &str, naming: &HeaderNaming) -> ConfigResult<()> {
    ensure_header_name(section, "actor_id", &naming.actor_id)?;
    ensure_header_name(section, "groups_prefix", &naming.groups_prefix)?;
    if naming.max_group_header_length == 0 {
        return Err(ConfigError::invalid(
            section,
            "max_group_header_length",
            Some("0".to_string()),
            "zero",
        ));
    }
    if let Some(filter) = &naming.group_filter {
        Regex::new(filter).map_err(|_| {
            ConfigError::invalid(section, "group_filter", Some(filter.clone()), "invalid_regex")
        })?;
    }
    Ok(())
}

fn validate_remote(section: &str, remote: &RemoteIdentityConfig) -> ConfigResult<()> {
    let url = Url::parse(&remote.url).map_err(|_| {
        ConfigError::invalid(section, "url", Some(remote.url.clone()), "invalid_url")
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            section,
            "url",
            Some(remote.url.clone()),
            "unsupported_scheme",
        ));
    }
    if remote.timeout_secs == 0 {
        return Err(ConfigError::invalid(
            section,
            "timeout_secs",
            Some("0".to_string()),
            "zero",
        ));
    }
    if remote.cache_ttl_secs == Some(0) {
        return Err(ConfigError::invalid(
            section,
            "cache_ttl_secs",
            Some("0".to_string()),
            "zero",
        ));
    }
    ensure_header_name(section, "user_header", &remote.user_header)?;
    ensure_header_name(section, "cache_key_header", &remote.cache_key_header)?;
    for header in &remote.include_headers {
        ensure_header_name(section, "include_headers", header)?;
    }
    if remote.group_headers.is_empty() {
        return Err(ConfigError::invalid(section, "group_headers", None, "empty"));
    }
    for pattern in &remote.group_headers {
        let name = pattern.strip_suffix('*').unwrap_or(pattern);
        ensure_header_name(section, "group_headers", name)?;
    }
    Ok(())
}

fn ensure_header_name(section: &str, field: &'static str, value: &str) -> ConfigResult<()> {
    HeaderName::from_bytes(value.as_bytes())
        .map(|_| ())
        .map_err(|_| ConfigError::invalid(section, field, Some(value.to_string()), "invalid_header_name"))
}
