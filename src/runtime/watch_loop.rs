//! # Watch Loop
//!
//! Runs the engine of one resource kind under a `kube-runtime` controller.
//!
//! The controller guarantees at most one reconciliation in flight per
//! resource. Besides the resources themselves it watches
//! `NamespaceCredentials`, so a claim change requeues every resource of the
//! namespaces it lists.

use crate::crd::NamespaceCredentials;
use crate::engine::{Engine, ReconcileError, ReconcileKey, Syncable};
use crate::observability::metrics;
use crate::runtime::error_policy::handle_reconciliation_error;
use futures::StreamExt;
use kube::api::Api;
use kube::{Client, Resource, ResourceExt};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{controller::Action, watcher, Controller};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, Instrument};

/// Shared state of one resource kind's controller
pub struct ControllerContext<S: Syncable> {
    pub engine: Engine<S>,
    /// Requeue delay after a failed reconciliation
    pub error_requeue: Duration,
}

impl<S: Syncable> std::fmt::Debug for ControllerContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerContext")
            .field("engine", &self.engine)
            .field("error_requeue", &self.error_requeue)
            .finish()
    }
}

/// Run the controller for kind `S` until a shutdown signal arrives
pub async fn run_controller<S: Syncable>(
    client: Client,
    ctx: Arc<ControllerContext<S>>,
    concurrency: u16,
) {
    info!("Starting {} controller...", S::KIND);

    let resources: Api<S::Resource> = Api::all(client.clone());
    let claims: Api<NamespaceCredentials> = Api::all(client);

    let controller = Controller::new(resources, watcher::Config::default())
        .with_config(kube_runtime::controller::Config::default().concurrency(concurrency));
    let store = controller.store();

    controller
        .watches(claims, watcher::Config::default(), move |claim| {
            store
                .state()
                .into_iter()
                .filter(|resource| {
                    resource
                        .namespace()
                        .is_some_and(|ns| claim.spec.namespaces.contains(&ns))
                })
                .map(|resource| ObjectRef::from_obj(&*resource))
                .collect::<Vec<_>>()
        })
        .shutdown_on_signal()
        .run(reconcile::<S>, handle_reconciliation_error::<S>, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                debug!("{} controller event error: {}", S::KIND, e);
            }
            futures::future::ready(())
        })
        .await;

    info!("{} controller stopped", S::KIND);
}

async fn reconcile<S: Syncable>(
    obj: Arc<S::Resource>,
    ctx: Arc<ControllerContext<S>>,
) -> Result<Action, ReconcileError> {
    let key = ReconcileKey::new(S::KIND, obj.namespace().unwrap_or_default(), obj.name_any());
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.kind = S::KIND,
        resource.namespace = key.namespace.as_str(),
        resource.name = key.name.as_str(),
        resource.generation = obj.meta().generation.unwrap_or(0),
    );

    metrics::increment_reconciliations(S::KIND);
    let started = Instant::now();
    let result = ctx.engine.reconcile(&key).instrument(span).await;
    metrics::observe_reconciliation_duration(S::KIND, started.elapsed().as_secs_f64());

    let outcome = result?;
    if outcome.requeue.is_some() {
        metrics::increment_requeues_total("interval");
    }
    Ok(outcome.into_action())
}
