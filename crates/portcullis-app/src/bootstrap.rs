use std::future::Future;
use std::net::SocketAddr;

use crate::error::{AppError, AppResult};
use portcullis_aliases::{AliasError, AliasStore, MasterSecret};
use portcullis_api::ApiServer;
use portcullis_config::{GatewayConfig, load_config};
use portcullis_identity::TopologyRegistry;
use portcullis_telemetry::{GlobalContextGuard, LoggingConfig, Metrics};
use tracing::{error, info, warn};

const BUILD_SHA: &str = match option_env!("PORTCULLIS_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Dependencies required to bootstrap the gateway.
pub(crate) struct BootstrapDependencies {
    config: GatewayConfig,
    master: Option<MasterSecret>,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config = load_config(None).map_err(|err| AppError::config("config.load", err))?;
        let master = match MasterSecret::resolve(&config.aliases.store_dir) {
            Ok(master) => Some(master),
            Err(AliasError::MasterSecretMissing { path }) => {
                warn!(
                    path = %path.display(),
                    "no master secret; alias store disabled until `portcullis create-master` runs"
                );
                None
            }
            Err(err) => return Err(AppError::aliases("master.resolve", err)),
        };
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            config,
            master,
            telemetry,
        })
    }
}

/// Services assembled from the dependencies, ready to serve.
pub(crate) struct Gateway {
    api: ApiServer,
    store: Option<AliasStore>,
    addr: SocketAddr,
}

/// Entry point for the gateway boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, or any service fails to start.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    let logging = &dependencies.config.logging;
    portcullis_telemetry::init_logging(&LoggingConfig::from_settings(
        &logging.level,
        logging.format.as_deref(),
        BUILD_SHA,
    ))
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");

    info!("Portcullis gateway bootstrap starting");
    run_app_with(dependencies, shutdown_signal()).await
}

/// Boot sequence over injected dependencies; returns once `shutdown` resolves
/// and unsaved alias changes have been flushed.
pub(crate) async fn run_app_with<F>(dependencies: BootstrapDependencies, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let Gateway { api, store, addr } = assemble(dependencies)?;
    info!(addr = %addr, "Launching preauth listener");
    let served = api.serve_with_shutdown(addr, shutdown).await;

    let flushed = store.as_ref().map_or(Ok(()), AliasStore::flush);
    served.map_err(|err| AppError::api_server("api_server.serve", err))?;
    flushed.map_err(|err| AppError::aliases("alias_store.flush", err))?;
    info!("Gateway shutdown complete");
    Ok(())
}

fn assemble(dependencies: BootstrapDependencies) -> AppResult<Gateway> {
    let BootstrapDependencies {
        config,
        master,
        telemetry,
    } = dependencies;

    let store = master
        .map(|master| {
            AliasStore::open(&config.aliases.store_dir, master)
                .map(|store| store.with_metrics(telemetry.clone()))
                .map_err(|err| AppError::aliases("alias_store.open", err))
        })
        .transpose()?;
    if let Some(store) = &store {
        info!(
            dir = %store.dir().display(),
            clusters = store.clusters().len(),
            "alias store opened"
        );
    }

    let topologies = TopologyRegistry::from_config(&config, Some(&telemetry))
        .map_err(|err| AppError::identity("topologies.build", err))?;
    info!(topologies = ?topologies.names().collect::<Vec<_>>(), "identity topologies ready");

    let api = ApiServer::new(topologies, telemetry, &config.server.hsts)
        .map_err(|err| AppError::api_server("api_server.new", err))?;
    let addr = SocketAddr::new(config.server.bind_addr, config.server.http_port);
    Ok(Gateway { api, store, addr })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
