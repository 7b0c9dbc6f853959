//! Resolver backed by the local user directory and static mapping rules.

use std::sync::Arc;

use async_trait::async_trait;
use http::{StatusCode, header::AUTHORIZATION};
use portcullis_config::LocalIdentityConfig;
use tracing::debug;

use crate::authn::{BasicCredentials, UserDirectory};
use crate::error::{IdentityError, IdentityResult, Rejection};
use crate::mapping::{GroupMapper, PrincipalMapper, StaticGroupMapper};
use crate::model::Identity;
use crate::resolver::{InboundCredentials, IdentityResolver};

/// Authenticates `Authorization: Basic` against the user directory.
///
/// Groups are looked up for the login name; the principal mapping only
/// renames the asserted principal afterwards.
pub struct LocalResolver {
    directory: Arc<UserDirectory>,
    principals: PrincipalMapper,
    groups: Arc<dyn GroupMapper>,
}

impl LocalResolver {
    /// Assemble a resolver from explicit parts.
    #[must_use]
    pub fn new(
        directory: Arc<UserDirectory>,
        principals: PrincipalMapper,
        groups: Arc<dyn GroupMapper>,
    ) -> Self {
        Self {
            directory,
            principals,
            groups,
        }
    }

    /// Build from a topology's `local` identity section.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidMapping`] when a mapping rule is malformed.
    pub fn from_config(
        directory: Arc<UserDirectory>,
        config: &LocalIdentityConfig,
    ) -> IdentityResult<Self> {
        let principals = config
            .principal_mapping
            .as_deref()
            .map(PrincipalMapper::parse)
            .transpose()?
            .unwrap_or_default();
        let groups = StaticGroupMapper::new(Arc::clone(&directory), config.group_mapping.as_deref())?;
        Ok(Self::new(directory, principals, Arc::new(groups)))
    }

    fn authenticate(&self, credentials: &InboundCredentials) -> IdentityResult<Identity> {
        let header = credentials
            .headers
            .get(AUTHORIZATION)
            .ok_or(IdentityError::AuthenticationFailed {
                reason: "missing_credentials",
            })?;
        let basic = BasicCredentials::from_header(header)?;
        let login = self.directory.authenticate(&basic)?;
        let groups = self.groups.groups_for(&login);
        let principal = self.principals.map(login)?;
        Ok(Identity::new(principal, groups))
    }
}

#[async_trait]
impl IdentityResolver for LocalResolver {
    fn mode(&self) -> &'static str {
        "local"
    }

    async fn resolve(&self, credentials: &InboundCredentials) -> Result<Identity, Rejection> {
        self.authenticate(credentials).map_err(|err| {
            debug!(error = %err, "local authentication rejected");
            match err {
                IdentityError::PasswordHash { .. } => {
                    Rejection::with_status(StatusCode::INTERNAL_SERVER_ERROR, err)
                }
                other => Rejection::unauthorized(other),
            }
        })
    }
}
