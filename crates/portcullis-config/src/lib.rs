#![forbid(unsafe_code)]
#![warn(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! File-backed configuration for the Portcullis gateway.
//!
//! Layout: `model.rs` (typed document), `defaults.rs` (fallback values),
//! `loader.rs` (YAML loading and `PORTCULLIS_*` overrides), `validate.rs`
//! (field validation), `error.rs` (error type).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_env_overrides, load_config, parse_document, read_document, resolve_config_path};
pub use model::{
    AliasSettings, FailMode, GatewayConfig, HeaderNaming, IdentitySource, LocalIdentityConfig,
    LoggingSettings, RemoteIdentityConfig, ServerConfig, TopologyConfig, UserEntry,
};
pub use validate::{is_valid_topology_name, validate_config};
