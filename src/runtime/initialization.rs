//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, Kubernetes and Console API clients and the namespace
//! credentials cache.

use crate::config::ControllerConfig;
use crate::console::ConsoleClient;
use crate::credentials::{
    KubeClaimSource, KubeSecretResolver, NamespaceCredentialsCache, Token, TokenResolver,
};
use crate::observability;
use crate::server::{start_server, ServerState};
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialization result containing all necessary components for the controllers
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Console API client shared by every engine
    pub console: ConsoleClient,
    /// Namespace credentials cache, already populated from registered claims
    pub credentials: Arc<NamespaceCredentialsCache>,
    /// Secret access for adapters that read resource secrets
    pub secrets: Arc<KubeSecretResolver>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("console", &self.console)
            .field("credentials", &self.credentials)
            .field(
                "server_ready",
                &self
                    .server_state
                    .is_ready
                    .load(std::sync::atomic::Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `log_level`. `log_format` selects JSON or
/// human-readable output.
pub fn init_tracing(log_level: &str, log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "console_sync_controller={},kube=warn,tower_http=warn",
            log_level.to_lowercase()
        ))
    });

    let result = if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if let Err(e) = result {
        warn!("Tracing subscriber already initialized: {}", e);
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes and Console API client creation
/// - Namespace credentials cache population
///
/// # Errors
///
/// Returns an error if metrics cannot be registered, a client cannot be
/// created or the registered claims cannot be listed.
pub async fn initialize(config: &ControllerConfig) -> Result<InitializationResult> {
    // Must run before any rustls client is built
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    init_tracing(&config.log_level, &config.log_format);

    info!("Starting Console Sync Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!("Configuration: {:?}", config);

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let port = config.metrics_port;
    let state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(port, state).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let console = ConsoleClient::new(&config.console_url, config.remote_timeout())
        .context("Failed to create Console API client")?;

    let secrets = Arc::new(KubeSecretResolver::new(client.clone()));
    let resolver = Arc::clone(&secrets) as Arc<dyn TokenResolver>;
    let credentials = Arc::new(NamespaceCredentialsCache::new(
        Token::new(config.console_token.clone()),
        resolver,
        Arc::new(KubeClaimSource::new(client.clone())),
    ));
    credentials
        .init()
        .await
        .context("Failed to initialize namespace credentials cache")?;

    info!("Controller initialized, starting watch loops...");

    Ok(InitializationResult {
        client,
        console,
        credentials,
        secrets,
        server_state,
    })
}
