//! The resolver seam shared by local and remote identity sources.

use async_trait::async_trait;
use http::HeaderMap;

use crate::error::Rejection;
use crate::model::Identity;

/// What a resolver sees of the inbound request.
#[derive(Debug, Clone, Default)]
pub struct InboundCredentials {
    /// Inbound request headers.
    pub headers: HeaderMap,
    /// Correlation id assigned to the request, if any.
    pub request_id: Option<String>,
}

impl InboundCredentials {
    /// Wrap request headers.
    #[must_use]
    pub const fn new(headers: HeaderMap) -> Self {
        Self {
            headers,
            request_id: None,
        }
    }

    /// Attach the request correlation id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Turns inbound credentials into an identity or a rejection.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Short label used in logs and metrics (`local` or `remote`).
    fn mode(&self) -> &'static str;

    /// Authenticate the caller.
    async fn resolve(&self, credentials: &InboundCredentials) -> Result<Identity, Rejection>;
}
