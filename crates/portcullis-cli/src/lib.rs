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
#![allow(clippy::redundant_pub_crate)]

//! Administrative CLI for the Portcullis gateway.
//!
//! Layout:
//! - `cli.rs`: argument parsing and command dispatch
//! - `commands/`: alias, master secret, and authentication handlers
//! - `client.rs`: error type, HTTP client, and shared helpers
//! - `output.rs`: renderers for listings and batch reports
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod output;

pub use cli::run;
