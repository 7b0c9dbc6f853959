//! Command handlers grouped by concern.

pub(crate) mod aliases;
pub(crate) mod auth;
pub(crate) mod master;
