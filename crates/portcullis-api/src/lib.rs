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

//! HTTP surface of the Portcullis gateway.
//!
//! Layout:
//! - `http/router.rs`: router construction and server host
//! - `http/preauth.rs`: per-topology preauthentication endpoint
//! - `http/health.rs`: health and Prometheus endpoints
//! - `http/errors.rs`: problem document responses
//! - `http/telemetry.rs`: per-route request counting layer
//! - `models.rs`: wire types shared with the CLI
//! - `state.rs`: handler state
//! - `error.rs`: bootstrap and serve errors

pub mod error;
pub mod http;
pub mod models;
pub(crate) mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
