//! # Error Policy
//!
//! Requeue policy for failed reconciliations.
//!
//! Failures are retried after a fixed interval. The error itself has already
//! been recorded on the resource status by the engine.

use crate::engine::{ReconcileError, Syncable};
use crate::observability;
use crate::runtime::watch_loop::ControllerContext;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

/// Handle reconciliation errors with a fixed requeue
pub fn handle_reconciliation_error<S: Syncable>(
    obj: Arc<S::Resource>,
    error: &ReconcileError,
    ctx: Arc<ControllerContext<S>>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.kind = S::KIND,
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {} {}/{}: {}", S::KIND, namespace, name, error);
    observability::metrics::increment_reconciliation_errors(S::KIND);

    info!(
        "🔄 Retrying in {}s (trigger source: error)",
        ctx.error_requeue.as_secs()
    );
    observability::metrics::increment_requeues_total("error");
    Action::requeue(ctx.error_requeue)
}
