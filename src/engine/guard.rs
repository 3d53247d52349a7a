//! # Deletion Guard
//!
//! Cascades the deletion of a resource to the Console API before the
//! resource itself is allowed to go away.
//!
//! ```text
//! NoGuard -> GuardActive -> AwaitingRemoteConfirmation -> Released
//! ```
//!
//! The guard finalizer stays on the resource while the guard is active or
//! awaiting confirmation. It is only removed once a fetch has confirmed that
//! the remote object is gone, or once the object was detached.

use crate::console::{ConsoleSession, RemoteError};
use crate::crd::{ConditionStatus, ConditionType, DeletionGuard};
use crate::engine::conditions::REASON_DELETING;
use crate::engine::reconcile::{Engine, Pass};
use crate::engine::record::{StoreError, SyncedResource};
use crate::engine::syncable::{RemoteObject, Syncable};
use crate::engine::types::{ReconcileError, ReconcileOutcome};
use tracing::{debug, info};

/// Remote state observed while deleting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observed {
    Absent,
    /// Present and already marked for deletion by the Console API
    Deleting,
    Present,
}

impl Observed {
    pub fn of<R: RemoteObject>(remote: Option<&R>) -> Self {
        match remote {
            None => Self::Absent,
            Some(r) if r.is_deleting() => Self::Deleting,
            Some(_) => Self::Present,
        }
    }
}

/// Next step of the deletion protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionStep {
    /// Nothing left remotely, remove the finalizer
    Release,
    /// Remote deletion is in progress, check again later
    Wait,
    /// Issue the delete (or the detach)
    Delete { detach: bool },
}

/// Decide the next deletion step for a guard state and the observed remote object
pub fn plan_deletion(guard: DeletionGuard, observed: Observed, detach: bool) -> DeletionStep {
    match (guard, observed) {
        (DeletionGuard::NoGuard | DeletionGuard::Released, _)
        | (DeletionGuard::GuardActive | DeletionGuard::AwaitingRemoteConfirmation, Observed::Absent) => {
            DeletionStep::Release
        }
        (_, Observed::Deleting) => DeletionStep::Wait,
        // Deletes are idempotent, re-issue them until the remote acknowledges
        (_, Observed::Present) => DeletionStep::Delete { detach },
    }
}

impl<S: Syncable> Engine<S> {
    /// Run one step of the deletion protocol for a resource marked for deletion
    pub(crate) async fn handle_delete(
        &self,
        mut pass: Pass<S::Resource>,
        session: &ConsoleSession,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if pass.status.is_readonly() {
            debug!("Releasing read-only {} without touching the Console API", pass.key);
            return self.release(pass).await;
        }

        let mut guard = pass.status.guard;
        let mut observed_by_key = None;

        // A managed resource may have crashed between create and the status write
        if !pass.status.has_id() && (guard.holds() || pass.status.readonly_condition().is_some()) {
            let key = self.adapter.natural_key(&pass.record);
            match self
                .remote("fetch_by_natural_key", self.adapter.fetch_by_natural_key(session, &key))
                .await
            {
                Ok(Some(remote)) => {
                    info!(
                        "Found {} created before its ID was recorded, deleting it",
                        pass.key
                    );
                    pass.status.id = Some(remote.id().to_string());
                    guard = DeletionGuard::GuardActive;
                    observed_by_key = Some(remote);
                }
                Ok(None) => {}
                Err(e) => return self.fail(pass, e.into()).await,
            }
        }

        let Some(id) = pass.status.id.clone().filter(|id| !id.is_empty()) else {
            return self.release(pass).await;
        };
        if !guard.holds() {
            return self.release(pass).await;
        }

        let observed = match observed_by_key {
            Some(remote) => Observed::of(Some(&remote)),
            None => match self
                .remote("fetch_observed", self.adapter.fetch_observed(session, &id))
                .await
            {
                Ok(remote) => Observed::of(remote.as_ref()),
                Err(e) => return self.fail(pass, e.into()).await,
            },
        };

        let detach = self.adapter.detach_on_delete(&pass.record);
        match plan_deletion(guard, observed, detach) {
            DeletionStep::Release => self.release(pass).await,
            DeletionStep::Wait => {
                self.await_remote(pass, "Waiting for the Console API to finish the deletion")
                    .await
            }
            DeletionStep::Delete { detach } => {
                let result = if detach {
                    self.remote("detach", self.adapter.detach(session, &id)).await
                } else {
                    self.remote("delete", self.adapter.delete(session, &id)).await
                };
                match result {
                    Ok(()) if detach => {
                        info!("Detached {} from the Console API", pass.key);
                        self.release(pass).await
                    }
                    Ok(()) => {
                        info!("Requested deletion of {} from the Console API", pass.key);
                        self.await_remote(pass, "Waiting for the Console API to confirm the deletion")
                            .await
                    }
                    Err(RemoteError::NotFound(_)) => self.release(pass).await,
                    Err(RemoteError::DeletionPending(message)) => {
                        debug!("Deletion of {} is pending: {}", pass.key, message);
                        pass.status.guard = guard;
                        self.report_deleting(&mut pass, message);
                        self.persist_and_requeue(pass).await
                    }
                    Err(e) => self.fail(pass, e.into()).await,
                }
            }
        }
    }

    async fn await_remote(
        &self,
        mut pass: Pass<S::Resource>,
        message: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        pass.status.guard = DeletionGuard::AwaitingRemoteConfirmation;
        self.report_deleting(&mut pass, message.to_string());
        self.persist_and_requeue(pass).await
    }

    async fn persist_and_requeue(
        &self,
        pass: Pass<S::Resource>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.persist(pass.record, &pass.status).await?;
        Ok(ReconcileOutcome::requeue_after(self.settings.wait_for_resources))
    }

    fn report_deleting(&self, pass: &mut Pass<S::Resource>, message: String) {
        pass.reporter.set(
            &mut pass.status.conditions,
            ConditionType::Synchronized,
            ConditionStatus::False,
            REASON_DELETING,
            message,
        );
    }

    /// Mark the guard released and remove the finalizer
    async fn release(&self, mut pass: Pass<S::Resource>) -> Result<ReconcileOutcome, ReconcileError> {
        pass.status.guard = DeletionGuard::Released;
        let record = if pass.record.sync_status() == Some(&pass.status) {
            pass.record
        } else {
            match self.persist(pass.record, &pass.status).await {
                Ok(record) => record,
                Err(StoreError::NotFound) => return Ok(ReconcileOutcome::done()),
                Err(e) => return Err(e.into()),
            }
        };

        match self.store.set_guard_marker(&record, false).await {
            Ok(_) | Err(StoreError::NotFound) => {
                debug!("Released deletion guard of {}", pass.key);
                Ok(ReconcileOutcome::done())
            }
            Err(e) => Err(e.into()),
        }
    }
}
