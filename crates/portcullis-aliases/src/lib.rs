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

//! Per-cluster encrypted alias credential store.
//!
//! Layout:
//! - `store.rs`: the `AliasStore` handle and its create/list/delete operations
//! - `vault.rs`: one cluster's sealed records and their JSON file
//! - `crypto.rs`: argon2 key derivation and AES-256-GCM sealing
//! - `master.rs`: master secret resolution and the `master` file
//! - `names.rs`: cluster and alias name rules
//! - `error.rs`: error type

pub mod crypto;
pub mod error;
pub mod master;
pub mod names;
pub mod store;
pub mod vault;

pub use error::{AliasError, AliasResult};
pub use master::{ENV_MASTER_SECRET, MASTER_FILE_NAME, MasterSecret, master_path};
pub use names::{DEFAULT_CLUSTER, validate_alias, validate_cluster};
pub use store::{
    AliasStore, AliasValue, BatchCreated, BulkEntry, ClusterBatch, ClusterListing, CreatedAlias,
    GENERATED_SECRET_LEN, generate_secret,
};
