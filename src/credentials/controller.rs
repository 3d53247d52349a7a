//! # NamespaceCredentials Controller
//!
//! Feeds `NamespaceCredentials` claims into the credentials cache and reports
//! whether each claim's token could be resolved.

use super::{claim_from_resource, CredentialsError, NamespaceCredentialsCache};
use crate::constants::{CREDENTIALS_FINALIZER, FIELD_MANAGER};
use crate::crd::{ConditionStatus, ConditionType, NamespaceCredentials, NamespaceCredentialsStatus};
use crate::engine::conditions::{ConditionReporter, REASON_ERROR, REASON_READY};
use crate::observability::metrics;
use futures::StreamExt;
use kube::api::{Patch, PatchParams};
use kube::runtime::finalizer::{finalizer, Event as Finalizer};
use kube::{Api, Client, ResourceExt};
use kube_runtime::{controller::Action, watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum NamespaceCredentialsError {
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Finalizer error: {0}")]
    Finalizer(#[source] Box<kube::runtime::finalizer::Error<NamespaceCredentialsError>>),
}

/// Shared state of the NamespaceCredentials controller
pub struct CredentialsContext {
    pub client: Client,
    pub cache: Arc<NamespaceCredentialsCache>,
    /// Claims are refreshed periodically so rotated secrets are picked up
    pub refresh_interval: Duration,
    pub error_requeue: Duration,
}

impl std::fmt::Debug for CredentialsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsContext")
            .field("cache", &self.cache)
            .field("refresh_interval", &self.refresh_interval)
            .finish_non_exhaustive()
    }
}

/// Run the NamespaceCredentials controller until shutdown
pub async fn run(ctx: Arc<CredentialsContext>) {
    let api: Api<NamespaceCredentials> = Api::all(ctx.client.clone());
    info!("Starting NamespaceCredentials controller...");

    Controller::new(api, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    info!("NamespaceCredentials controller stopped");
}

async fn reconcile(
    claim: Arc<NamespaceCredentials>,
    ctx: Arc<CredentialsContext>,
) -> Result<Action, NamespaceCredentialsError> {
    let api: Api<NamespaceCredentials> = Api::all(ctx.client.clone());
    finalizer(&api, CREDENTIALS_FINALIZER, claim, |event| async {
        match event {
            Finalizer::Apply(claim) => apply(&claim, &api, &ctx).await,
            Finalizer::Cleanup(claim) => cleanup(&claim, &ctx).await,
        }
    })
    .await
    .map_err(|e| NamespaceCredentialsError::Finalizer(Box::new(e)))
}

async fn apply(
    claim: &NamespaceCredentials,
    api: &Api<NamespaceCredentials>,
    ctx: &CredentialsContext,
) -> Result<Action, NamespaceCredentialsError> {
    let name = claim.name_any();
    ctx.cache.add_claim(&claim_from_resource(claim)).await?;

    let mut status = claim.status.clone().unwrap_or_default();
    let reporter = ConditionReporter::new(claim.metadata.generation);
    match ctx.cache.claim_error(&name) {
        Some(e) => {
            warn!("NamespaceCredentials {} cannot be used: {}", name, e);
            reporter.set(
                &mut status.conditions,
                ConditionType::Ready,
                ConditionStatus::False,
                REASON_ERROR,
                e.to_string(),
            );
        }
        None => reporter.set(
            &mut status.conditions,
            ConditionType::Ready,
            ConditionStatus::True,
            REASON_READY,
            "",
        ),
    }
    status.observed_generation = claim.metadata.generation;

    if claim.status.as_ref() != Some(&status) {
        patch_status(api, &name, &status).await?;
    }
    Ok(Action::requeue(ctx.refresh_interval))
}

async fn cleanup(
    claim: &NamespaceCredentials,
    ctx: &CredentialsContext,
) -> Result<Action, NamespaceCredentialsError> {
    let name = claim.name_any();
    ctx.cache.remove_claim(&name, &claim.spec.namespaces).await;
    info!("Released namespace credentials {}", name);
    Ok(Action::await_change())
}

async fn patch_status(
    api: &Api<NamespaceCredentials>,
    name: &str,
    status: &NamespaceCredentialsStatus,
) -> Result<(), kube::Error> {
    let patch = serde_json::json!({ "status": status });
    api.patch_status(
        name,
        &PatchParams::apply(FIELD_MANAGER),
        &Patch::Merge(&patch),
    )
    .await?;
    Ok(())
}

fn error_policy(
    claim: Arc<NamespaceCredentials>,
    error: &NamespaceCredentialsError,
    ctx: Arc<CredentialsContext>,
) -> Action {
    error!(
        "NamespaceCredentials reconciliation error for {}: {}",
        claim.name_any(),
        error
    );
    metrics::increment_reconciliation_errors("NamespaceCredentials");
    metrics::increment_requeues_total("error");
    Action::requeue(ctx.error_requeue)
}
