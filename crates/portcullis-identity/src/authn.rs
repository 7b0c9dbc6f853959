//! HTTP Basic credential parsing and verification against the user directory.

use std::collections::HashMap;

use argon2::Argon2;
use argon2::password_hash::{
    Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    rand_core::OsRng,
};
use base64::{Engine as _, engine::general_purpose};
use http::HeaderValue;
use portcullis_config::UserEntry;

use crate::error::{IdentityError, IdentityResult};
use crate::model::Principal;

/// Username and password carried by `Authorization: Basic`.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Login name.
    pub username: String,
    password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BasicCredentials {
    /// Pair a username with a password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::AuthenticationFailed`] when the scheme is not
    /// `Basic` or the payload is not `base64(user:password)`.
    pub fn from_header(value: &HeaderValue) -> IdentityResult<Self> {
        let failed = |reason| IdentityError::AuthenticationFailed { reason };
        let text = value.to_str().map_err(|_| failed("malformed_credentials"))?;
        let (scheme, payload) = text
            .trim()
            .split_once(' ')
            .ok_or_else(|| failed("malformed_credentials"))?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(failed("unsupported_scheme"));
        }
        let decoded = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|_| failed("malformed_credentials"))?;
        let decoded = String::from_utf8(decoded).map_err(|_| failed("malformed_credentials"))?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| failed("malformed_credentials"))?;
        if username.is_empty() {
            return Err(failed("malformed_credentials"));
        }
        Ok(Self::new(username, password))
    }

    /// Render as an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidHeader`] if the encoded value is not a
    /// valid header (never the case for base64 output).
    pub fn to_header(&self) -> IdentityResult<HeaderValue> {
        let encoded =
            general_purpose::STANDARD.encode(format!("{}:{}", self.username, self.password));
        HeaderValue::from_str(&format!("Basic {encoded}")).map_err(|_| {
            IdentityError::InvalidHeader {
                name: "authorization".to_string(),
                reason: "invalid_value",
            }
        })
    }
}

/// Stored password hash and directory groups for one user.
#[derive(Debug, Clone, Default)]
pub struct DirectoryEntry {
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Groups reported by the directory.
    pub groups: Vec<String>,
}

/// Local user directory backing `local` topologies.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: HashMap<String, DirectoryEntry>,
}

impl UserDirectory {
    /// Build from configured user entries.
    #[must_use]
    pub fn from_config(entries: &[UserEntry]) -> Self {
        Self::from_records(entries.iter().map(|entry| {
            (
                entry.name.clone(),
                DirectoryEntry {
                    password_hash: entry.password_hash.clone(),
                    groups: entry.groups.clone(),
                },
            )
        }))
    }

    /// Build from `(name, entry)` pairs.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = (String, DirectoryEntry)>) -> Self {
        Self {
            users: records.into_iter().collect(),
        }
    }

    /// Groups the directory reports for `name`; empty for unknown users.
    #[must_use]
    pub fn groups_of(&self, name: &str) -> &[String] {
        self.users
            .get(name)
            .map_or(&[][..], |entry| entry.groups.as_slice())
    }

    /// Verify `credentials` and return the authenticated principal.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::AuthenticationFailed`] for unknown users or
    /// wrong passwords, and [`IdentityError::PasswordHash`] when a stored hash
    /// cannot be parsed.
    pub fn authenticate(&self, credentials: &BasicCredentials) -> IdentityResult<Principal> {
        let entry = self.users.get(&credentials.username).ok_or(
            IdentityError::AuthenticationFailed {
                reason: "unknown_user",
            },
        )?;
        if verify_password(&entry.password_hash, &credentials.password)? {
            Principal::new(credentials.username.clone())
        } else {
            Err(IdentityError::AuthenticationFailed {
                reason: "bad_password",
            })
        }
    }
}

/// Hash `password` into an Argon2 PHC string for the user directory.
///
/// # Errors
///
/// Returns [`IdentityError::PasswordHash`] if hashing fails.
pub fn hash_password(password: &str) -> IdentityResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|detail| IdentityError::PasswordHash { detail })?;
    Ok(hash.to_string())
}

fn verify_password(expected_hash: &str, candidate: &str) -> IdentityResult<bool> {
    let parsed =
        PasswordHash::new(expected_hash).map_err(|detail| IdentityError::PasswordHash { detail })?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(detail) => Err(IdentityError::PasswordHash { detail }),
    }
}
