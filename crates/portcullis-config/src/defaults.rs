//! Default values applied when the configuration document omits a field.
//!
//! # Design
//! - Header defaults follow the naming scheme downstream services already read.
//! - Time-based defaults are explicit so operators can audit them.

/// Default header carrying the asserted principal.
pub const DEFAULT_ACTOR_ID_HEADER: &str = "X-Knox-Actor-ID";
/// Default prefix for the fanned-out group headers.
pub const DEFAULT_GROUPS_HEADER_PREFIX: &str = "X-Knox-Actor-Groups";
/// Default pattern matching the group headers returned by a remote preauth endpoint.
pub const DEFAULT_REMOTE_GROUP_HEADER_PATTERN: &str = "X-Knox-Actor-Groups-*";
/// Maximum length of a single group header value before a new header is started.
pub const DEFAULT_MAX_GROUP_HEADER_LENGTH: usize = 1000;
/// Header whose value keys the remote authentication cache.
pub const DEFAULT_CACHE_KEY_HEADER: &str = "Authorization";
/// Upper bound on a remote preauth round trip.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;
/// HSTS value attached to every response.
pub const DEFAULT_HSTS: &str = "max-age=300; includeSubDomains";
/// Default listener port.
pub const DEFAULT_HTTP_PORT: u16 = 8443;
/// Default directory holding the per-cluster credential files.
pub const DEFAULT_ALIAS_STORE_DIR: &str = "data/security/keystores";
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Environment variable naming the configuration file.
pub const ENV_CONFIG_PATH: &str = "PORTCULLIS_CONFIG";
