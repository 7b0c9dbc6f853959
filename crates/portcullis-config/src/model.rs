//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers deserialised from the gateway YAML document.
//! - Every optional field has a default so a minimal document stays short.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_ACTOR_ID_HEADER, DEFAULT_ALIAS_STORE_DIR, DEFAULT_CACHE_KEY_HEADER,
    DEFAULT_GROUPS_HEADER_PREFIX, DEFAULT_HSTS, DEFAULT_HTTP_PORT, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_GROUP_HEADER_LENGTH, DEFAULT_REMOTE_GROUP_HEADER_PATTERN,
    DEFAULT_REMOTE_TIMEOUT_SECS,
};

/// Root of the gateway configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Alias credential store settings.
    pub aliases: AliasSettings,
    /// Local user directory consulted by `local` topologies.
    pub users: Vec<UserEntry>,
    /// Topologies keyed by the name used in `/gateway/{topology}/...`.
    pub topologies: BTreeMap<String, TopologyConfig>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// IP address the listener binds to.
    pub bind_addr: IpAddr,
    /// Port the listener binds to.
    pub http_port: u16,
    /// `Strict-Transport-Security` value attached to every response.
    pub hsts: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: DEFAULT_HTTP_PORT,
            hsts: DEFAULT_HSTS.to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Level directive used when `RUST_LOG` is unset.
    pub level: String,
    /// `json` or `pretty`; inferred from the build profile when absent.
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: None,
        }
    }
}

/// Alias credential store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AliasSettings {
    /// Directory holding `<cluster>-credentials.json` files and the master file.
    pub store_dir: PathBuf,
}

impl Default for AliasSettings {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_ALIAS_STORE_DIR),
        }
    }
}

/// Entry in the local user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserEntry {
    /// Login name.
    pub name: String,
    /// Argon2 PHC string (see `portcullis hash-password`).
    pub password_hash: String,
    /// Groups the directory reports for this user.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Per-topology identity assertion settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopologyConfig {
    /// Naming scheme of the headers this topology emits.
    pub headers: HeaderNaming,
    /// Where identity comes from.
    pub identity: IdentitySource,
}

/// Header naming scheme for asserted identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderNaming {
    /// Header carrying the principal.
    pub actor_id: String,
    /// Prefix of the group headers (`<prefix>-1`, `<prefix>-2`, ...).
    pub groups_prefix: String,
    /// Longest value a single group header may carry.
    pub max_group_header_length: usize,
    /// Regular expression a group must fully match to be emitted.
    pub group_filter: Option<String>,
}

impl Default for HeaderNaming {
    fn default() -> Self {
        Self {
            actor_id: DEFAULT_ACTOR_ID_HEADER.to_string(),
            groups_prefix: DEFAULT_GROUPS_HEADER_PREFIX.to_string(),
            max_group_header_length: DEFAULT_MAX_GROUP_HEADER_LENGTH,
            group_filter: None,
        }
    }
}

/// Identity resolution strategy for a topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IdentitySource {
    /// Authenticate against the local user directory.
    Local(LocalIdentityConfig),
    /// Delegate to a remote preauth endpoint.
    Remote(RemoteIdentityConfig),
}

impl Default for IdentitySource {
    fn default() -> Self {
        Self::Local(LocalIdentityConfig::default())
    }
}

impl IdentitySource {
    /// Short label used in logs and metrics.
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Remote(_) => "remote",
        }
    }
}

/// Mapping rules applied after local authentication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalIdentityConfig {
    /// Principal renames, e.g. `guest,anon=anonymous;svc=hdfs`.
    pub principal_mapping: Option<String>,
    /// Extra groups per user, e.g. `*=users;admin=ops,audit`.
    pub group_mapping: Option<String>,
}

/// Remote preauth delegation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteIdentityConfig {
    /// Remote preauth endpoint.
    pub url: String,
    /// Inbound headers forwarded alongside `Authorization`.
    pub include_headers: Vec<String>,
    /// Header in the remote response carrying the principal.
    pub user_header: String,
    /// Remote group header names; a trailing `*` matches by prefix.
    pub group_headers: Vec<String>,
    /// Bound on the remote round trip, in seconds.
    pub timeout_secs: u64,
    /// Lifetime of cached verdicts; caching is off when absent.
    pub cache_ttl_secs: Option<u64>,
    /// Inbound header whose value keys the cache.
    pub cache_key_header: String,
    /// Status reported when the remote cannot produce a verdict.
    pub fail_mode: FailMode,
    /// PEM bundle added to the outbound trust store.
    pub ca_cert_path: Option<PathBuf>,
}

impl Default for RemoteIdentityConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            include_headers: Vec::new(),
            user_header: DEFAULT_ACTOR_ID_HEADER.to_string(),
            group_headers: vec![DEFAULT_REMOTE_GROUP_HEADER_PATTERN.to_string()],
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            cache_ttl_secs: None,
            cache_key_header: DEFAULT_CACHE_KEY_HEADER.to_string(),
            fail_mode: FailMode::default(),
            ca_cert_path: None,
        }
    }
}

/// Response when a remote preauth endpoint cannot be reached or errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    /// Reject with `401 Unauthorized`.
    #[default]
    Closed,
    /// Reject with `503 Service Unavailable`.
    Unavailable,
}

impl FailMode {
    /// Render the mode as its configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Unavailable => "unavailable",
        }
    }

    /// HTTP status reported for this mode.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Closed => 401,
            Self::Unavailable => 503,
        }
    }
}

impl FromStr for FailMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "closed" => Ok(Self::Closed),
            "unavailable" => Ok(Self::Unavailable),
            other => Err(format!("invalid fail mode '{other}'")),
        }
    }
}
