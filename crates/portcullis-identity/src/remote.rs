//! Resolver that delegates authentication to a remote preauth endpoint.
//!
//! The inbound `Authorization` header (plus any configured extras) is replayed
//! against the endpoint. A `200` answer carries the identity in its response
//! headers; a `4xx` answer is passed through to the caller; anything else is
//! reported with the configured fail status.

use std::fs;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use portcullis_config::{FailMode, RemoteIdentityConfig};
use portcullis_telemetry::{Metrics, current_request_id};
use reqwest::{Certificate, Client, redirect};
use tracing::{debug, warn};
use url::Url;

use crate::cache::AuthCache;
use crate::error::{IdentityError, IdentityResult, Rejection};
use crate::headers::{GroupHeaderPattern, decode_identity};
use crate::model::Identity;
use crate::resolver::{InboundCredentials, IdentityResolver};

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Delegates authentication to a remote preauth endpoint.
pub struct RemoteDelegatingResolver {
    client: Client,
    url: Url,
    include_headers: Vec<HeaderName>,
    user_header: HeaderName,
    group_patterns: Vec<GroupHeaderPattern>,
    cache: Option<AuthCache>,
    cache_key_header: HeaderName,
    fail_status: StatusCode,
    metrics: Option<Metrics>,
}

impl RemoteDelegatingResolver {
    /// Build from a topology's `remote` identity section.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL or a header name is invalid, the CA
    /// bundle cannot be read, or the HTTP client cannot be built.
    pub fn from_config(config: &RemoteIdentityConfig) -> IdentityResult<Self> {
        let url = Url::parse(&config.url).map_err(|source| IdentityError::InvalidRemoteUrl {
            url: config.url.clone(),
            source,
        })?;

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect::Policy::none());
        if let Some(path) = &config.ca_cert_path {
            let pem = fs::read(path).map_err(|source| IdentityError::TrustStore {
                path: path.clone(),
                source,
            })?;
            let certificate = Certificate::from_pem(&pem)
                .map_err(|source| IdentityError::HttpClient { source })?;
            builder = builder.add_root_certificate(certificate);
        }
        let client = builder
            .build()
            .map_err(|source| IdentityError::HttpClient { source })?;

        let include_headers = config
            .include_headers
            .iter()
            .map(|name| parse_header_name(name))
            .collect::<IdentityResult<Vec<_>>>()?;
        let group_patterns = config
            .group_headers
            .iter()
            .map(|pattern| GroupHeaderPattern::parse(pattern))
            .collect::<IdentityResult<Vec<_>>>()?;

        Ok(Self {
            client,
            url,
            include_headers,
            user_header: parse_header_name(&config.user_header)?,
            group_patterns,
            cache: config
                .cache_ttl_secs
                .map(|ttl| AuthCache::new(Duration::from_secs(ttl))),
            cache_key_header: parse_header_name(&config.cache_key_header)?,
            fail_status: fail_status(config.fail_mode),
            metrics: None,
        })
    }

    /// Record latency and cache hits on `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Endpoint this resolver calls.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    fn fail(&self, cause: IdentityError) -> Rejection {
        Rejection::with_status(self.fail_status, cause)
    }

    async fn call_remote(
        &self,
        authorization: &HeaderValue,
        credentials: &InboundCredentials,
    ) -> Result<Identity, Rejection> {
        let mut outbound = HeaderMap::new();
        outbound.insert(AUTHORIZATION, authorization.clone());
        for name in &self.include_headers {
            for value in credentials.headers.get_all(name) {
                outbound.append(name.clone(), value.clone());
            }
        }
        let request_id = credentials.request_id.clone().or_else(current_request_id);
        if let Some(value) = request_id.and_then(|id| HeaderValue::from_str(&id).ok()) {
            outbound.insert(X_REQUEST_ID, value);
        }

        let started = Instant::now();
        let outcome = self
            .client
            .get(self.url.clone())
            .headers(outbound)
            .send()
            .await;
        if let Some(metrics) = &self.metrics {
            metrics.observe_remote_auth_latency(started.elapsed());
        }

        let response = outcome.map_err(|source| {
            warn!(url = %self.url, error = %source, "remote authentication endpoint unreachable");
            self.fail(IdentityError::RemoteAuthUnreachable {
                url: self.url.to_string(),
                source,
            })
        })?;

        let status = response.status();
        if status == StatusCode::OK {
            decode_identity(response.headers(), &self.user_header, &self.group_patterns).map_err(
                |err| {
                    warn!(url = %self.url, error = %err, "remote authentication response lacked identity");
                    self.fail(IdentityError::RemoteAuthFailed {
                        url: self.url.to_string(),
                        status: status.as_u16(),
                    })
                },
            )
        } else if status.is_client_error() {
            debug!(url = %self.url, status = status.as_u16(), "remote authentication rejected");
            Err(Rejection::with_status(
                status,
                IdentityError::AuthenticationFailed {
                    reason: "remote_rejected",
                },
            ))
        } else {
            warn!(url = %self.url, status = status.as_u16(), "remote authentication endpoint failed");
            Err(self.fail(IdentityError::RemoteAuthFailed {
                url: self.url.to_string(),
                status: status.as_u16(),
            }))
        }
    }
}

#[async_trait]
impl IdentityResolver for RemoteDelegatingResolver {
    fn mode(&self) -> &'static str {
        "remote"
    }

    async fn resolve(&self, credentials: &InboundCredentials) -> Result<Identity, Rejection> {
        let Some(authorization) = credentials.headers.get(AUTHORIZATION) else {
            return Err(Rejection::unauthorized(
                IdentityError::AuthenticationFailed {
                    reason: "missing_credentials",
                },
            ));
        };

        let cache_key = self.cache.as_ref().and_then(|_| {
            credentials
                .headers
                .get(&self.cache_key_header)
                .map(|value| AuthCache::key_for(value.as_bytes()))
        });
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key)
            && let Some(identity) = cache.get(key)
        {
            if let Some(metrics) = &self.metrics {
                metrics.inc_remote_auth_cache_hit();
            }
            return Ok(identity);
        }

        let identity = self.call_remote(authorization, credentials).await?;
        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            cache.insert(key, identity.clone());
        }
        Ok(identity)
    }
}

fn parse_header_name(name: &str) -> IdentityResult<HeaderName> {
    HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| IdentityError::InvalidHeader {
        name: name.to_string(),
        reason: "invalid_name",
    })
}

const fn fail_status(mode: FailMode) -> StatusCode {
    match mode {
        FailMode::Closed => StatusCode::UNAUTHORIZED,
        FailMode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}
