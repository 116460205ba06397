//! Grant Server
//!
//! Single-binary HTTP service that issues grant codes, exchanges them for
//! access/refresh token pairs, refreshes and verifies tokens, all held in
//! process memory.

mod config;
mod error;
mod metrics;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use common::Secret;
use oauth_grant::{Backend, Client, Options, RequestParams, Server, SimpleClient, SimpleStorage, VerifyHook};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, StorageBackend};
use crate::metrics::ServiceMetrics;
use crate::routes::{AppState, build_router};

/// Upper bound on draining in-flight requests after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting grant-server");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        backend = ?config.storage.backend,
        clients = config.clients.len(),
        check_redirect = config.oauth.check_redirect,
        require_client_secret = config.oauth.require_client_secret,
        "configuration loaded"
    );

    let server = build_server(&config)?;
    let state = AppState {
        server: Arc::new(server),
        metrics: ServiceMetrics::new(),
        prometheus: prometheus_handle,
    };
    let app = build_router(state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Wire storage, registered clients and options into a `Server`.
fn build_server(config: &Config) -> Result<Server> {
    let backend = match config.storage.backend {
        StorageBackend::Memory => Backend::SyncMap,
        StorageBackend::Lru => Backend::Lru {
            capacity: config.storage.lru_capacity,
        },
    };
    let storage = SimpleStorage::with_backend(None, backend).context("failed to create storage")?;

    for client in &config.clients {
        let secret = client
            .secret
            .clone()
            .unwrap_or_else(|| Secret::new(String::new()));
        storage
            .put_client(Arc::new(SimpleClient::new(
                client.id.clone(),
                secret,
                client.redirects.clone(),
            )))
            .with_context(|| format!("failed to register client {}", client.id))?;
    }

    let mut options = Options::default()
        .with_check_redirect(config.oauth.check_redirect)
        .with_token_lifetimes(
            config.oauth.access_token_expire_secs,
            config.oauth.refresh_token_expire_secs,
        );
    if config.oauth.require_client_secret {
        options = options.with_verify(client_secret_hook());
    }

    Ok(Server::new(options, Arc::new(storage)))
}

/// Reject requests whose `client_secret` does not match the client's.
/// Clients registered without a secret never pass.
fn client_secret_hook() -> VerifyHook {
    Arc::new(
        |client: &dyn Client, params: &RequestParams| -> std::result::Result<(), String> {
            let expected = client.secret();
            if !expected.is_empty()
                && common::constant_time_eq(expected, params.value("client_secret"))
            {
                Ok(())
            } else {
                Err(format!("client_secret mismatch for client {}", client.id()))
            }
        },
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
