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
#![allow(clippy::module_name_repetitions)]

//! Identity assertion for the Portcullis gateway.
//!
//! Layout:
//! - `model.rs`: principal, group set, identity
//! - `headers.rs`: header codec and group header chunking
//! - `mapping.rs`: principal and group mapping rules
//! - `authn.rs`: Basic credentials and the argon2 user directory
//! - `resolver.rs`: resolver trait and inbound credentials
//! - `local.rs` / `remote.rs`: local and delegated resolvers
//! - `cache.rs`: TTL cache for remote verdicts
//! - `topology.rs`: named resolver plus codec pairs
//! - `error.rs`: error and rejection types

pub mod authn;
pub mod cache;
pub mod error;
pub mod headers;
pub mod local;
pub mod mapping;
pub mod model;
pub mod remote;
pub mod resolver;
pub mod topology;

pub use authn::{BasicCredentials, DirectoryEntry, UserDirectory, hash_password};
pub use cache::AuthCache;
pub use error::{IdentityError, IdentityResult, Rejection};
pub use headers::{GroupHeaderPattern, GroupHeaders, HeaderCodec, decode_identity};
pub use local::LocalResolver;
pub use mapping::{GroupMapper, MappingRule, PrincipalMapper, StaticGroupMapper, parse_rules};
pub use model::{GroupSet, Identity, Principal};
pub use remote::RemoteDelegatingResolver;
pub use resolver::{IdentityResolver, InboundCredentials};
pub use topology::{Topology, TopologyRegistry};
