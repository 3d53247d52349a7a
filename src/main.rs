//! # Console Sync Controller
//!
//! A Kubernetes controller that keeps `GitRepository`, `InfrastructureStack` and
//! `NotificationRouter` resources synchronized with the Console API.
//!
//! ## Overview
//!
//! 1. **Watching resources** - One controller per enabled kind watches resources across all namespaces
//! 2. **Resolving credentials** - Each namespace uses the token of the `NamespaceCredentials` claim listing it, or the default token
//! 3. **Detecting drift** - Attributes are fingerprinted and only pushed when the fingerprint changes
//! 4. **Guarding deletion** - Remote objects are deleted (or detached) before their resources go away
//!
//! Enable a subset of controllers with `RECONCILERS`, e.g. `RECONCILERS=gitrepository,namespacecredentials`.

use anyhow::Result;
use console_sync_controller::config::ControllerConfig;
use console_sync_controller::credentials::controller::{
    self as credentials_controller, CredentialsContext,
};
use console_sync_controller::credentials::SecretReader;
use console_sync_controller::crd::GitRepository;
use console_sync_controller::engine::{
    Engine, EngineSettings, KubeRecordStore, RecordStore, Syncable,
};
use console_sync_controller::kinds::{
    GitRepositoryAdapter, InfrastructureStackAdapter, NotificationRouterAdapter, ResourceKind,
};
use console_sync_controller::runtime::{
    initialize, run_controller, ControllerContext, InitializationResult,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ControllerConfig::from_env()?;
    config.validate()?;

    let init = initialize(&config).await?;
    let settings = EngineSettings::from(&config);

    let mut controllers: Vec<BoxFuture<'static, ()>> = Vec::new();
    for kind in &config.reconcilers {
        let controller = match kind {
            ResourceKind::GitRepository => {
                let secrets = Arc::clone(&init.secrets) as Arc<dyn SecretReader>;
                let adapter = GitRepositoryAdapter::new(secrets);
                engine_controller(&init, &config, settings, adapter)
            }
            ResourceKind::InfrastructureStack => {
                let repositories: Arc<dyn RecordStore<GitRepository>> =
                    Arc::new(KubeRecordStore::<GitRepository>::new(init.client.clone()));
                let adapter = InfrastructureStackAdapter::new(repositories);
                engine_controller(&init, &config, settings, adapter)
            }
            ResourceKind::NotificationRouter => {
                engine_controller(&init, &config, settings, NotificationRouterAdapter)
            }
            ResourceKind::NamespaceCredentials => {
                let ctx = Arc::new(CredentialsContext {
                    client: init.client.clone(),
                    cache: Arc::clone(&init.credentials),
                    refresh_interval: config.requeue_interval(),
                    error_requeue: config.reconciliation_error_requeue_duration(),
                });
                credentials_controller::run(ctx).boxed()
            }
        };
        controllers.push(controller);
    }

    info!(
        "Running {} controller(s): {}",
        controllers.len(),
        config
            .reconcilers
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    init.server_state.set_ready(true);

    futures::future::join_all(controllers).await;

    info!("All controllers stopped, shutting down");
    Ok(())
}

fn engine_controller<S: Syncable>(
    init: &InitializationResult,
    config: &ControllerConfig,
    settings: EngineSettings,
    adapter: S,
) -> BoxFuture<'static, ()> {
    let store: Arc<dyn RecordStore<S::Resource>> =
        Arc::new(KubeRecordStore::<S::Resource>::new(init.client.clone()));
    let engine = Engine::new(
        adapter,
        store,
        Arc::clone(&init.credentials),
        init.console.clone(),
        settings,
    );
    let ctx = Arc::new(ControllerContext {
        engine,
        error_requeue: config.reconciliation_error_requeue_duration(),
    });
    run_controller(init.client.clone(), ctx, config.max_concurrent_reconciliations).boxed()
}
