//! Topologies: a named pairing of a resolver with a header codec.

use std::collections::BTreeMap;
use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use portcullis_config::{GatewayConfig, IdentitySource, TopologyConfig};
use portcullis_telemetry::Metrics;
use tracing::info;

use crate::authn::UserDirectory;
use crate::error::{IdentityError, IdentityResult, Rejection};
use crate::headers::HeaderCodec;
use crate::local::LocalResolver;
use crate::model::Identity;
use crate::remote::RemoteDelegatingResolver;
use crate::resolver::{InboundCredentials, IdentityResolver};

/// One configured topology.
pub struct Topology {
    name: String,
    codec: HeaderCodec,
    resolver: Arc<dyn IdentityResolver>,
}

impl Topology {
    /// Pair a codec with a resolver under `name`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        codec: HeaderCodec,
        resolver: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            name: name.into(),
            codec,
            resolver,
        }
    }

    /// Build a topology from its configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidTopology`] wrapping the first invalid
    /// header name, mapping rule, URL, or trust store.
    pub fn from_config(
        name: &str,
        config: &TopologyConfig,
        directory: &Arc<UserDirectory>,
        metrics: Option<&Metrics>,
    ) -> IdentityResult<Self> {
        let build = || -> IdentityResult<Self> {
            let codec = HeaderCodec::from_naming(&config.headers)?;
            let resolver: Arc<dyn IdentityResolver> = match &config.identity {
                IdentitySource::Local(local) => {
                    Arc::new(LocalResolver::from_config(Arc::clone(directory), local)?)
                }
                IdentitySource::Remote(remote) => {
                    let mut resolver = RemoteDelegatingResolver::from_config(remote)?;
                    if let Some(metrics) = metrics {
                        resolver = resolver.with_metrics(metrics.clone());
                    }
                    Arc::new(resolver)
                }
            };
            Ok(Self::new(name, codec, resolver))
        };
        build().map_err(|source| IdentityError::InvalidTopology {
            topology: name.to_string(),
            source: Box::new(source),
        })
    }

    /// Topology name as it appears in request paths.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Codec used for asserted headers.
    #[must_use]
    pub const fn codec(&self) -> &HeaderCodec {
        &self.codec
    }

    /// Resolver mode label.
    #[must_use]
    pub fn mode(&self) -> &'static str {
        self.resolver.mode()
    }

    /// Authenticate the caller.
    ///
    /// # Errors
    ///
    /// Returns the resolver's [`Rejection`] unchanged.
    pub async fn resolve(&self, credentials: &InboundCredentials) -> Result<Identity, Rejection> {
        self.resolver.resolve(credentials).await
    }

    /// Encode `identity` under this topology's naming scheme.
    ///
    /// # Errors
    ///
    /// Returns a `500` [`Rejection`] when the identity cannot be carried in
    /// headers.
    pub fn assert_headers(&self, identity: &Identity) -> Result<HeaderMap, Rejection> {
        self.codec
            .encode(identity)
            .map_err(|err| Rejection::with_status(StatusCode::INTERNAL_SERVER_ERROR, err))
    }
}

/// All topologies served by the gateway, keyed by name.
#[derive(Default)]
pub struct TopologyRegistry {
    topologies: BTreeMap<String, Arc<Topology>>,
}

impl TopologyRegistry {
    /// Build every topology declared in `config`.
    ///
    /// # Errors
    ///
    /// Returns the first topology that fails to build.
    pub fn from_config(config: &GatewayConfig, metrics: Option<&Metrics>) -> IdentityResult<Self> {
        let directory = Arc::new(UserDirectory::from_config(&config.users));
        let mut registry = Self::default();
        for (name, topology) in &config.topologies {
            let built = Topology::from_config(name, topology, &directory, metrics)?;
            info!(topology = %name, mode = built.mode(), "topology loaded");
            registry.insert(built);
        }
        if let Some(metrics) = metrics {
            metrics.set_topologies_configured(registry.len());
        }
        Ok(registry)
    }

    /// Add or replace a topology.
    pub fn insert(&mut self, topology: Topology) {
        self.topologies
            .insert(topology.name.clone(), Arc::new(topology));
    }

    /// Topology registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Topology>> {
        self.topologies.get(name).cloned()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.topologies.keys().map(String::as_str)
    }

    /// Number of registered topologies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.topologies.len()
    }

    /// Whether no topology is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topologies.is_empty()
    }
}
