//! # Reconciliation Engine
//!
//! Generic reconciliation loop, instantiated once per resource kind.
//!
//! Every pass reads the resource fresh and walks the same steps:
//!
//! 1. **Fetch** the resource. A missing resource ends the pass.
//! 2. **Credentials**: resolve the namespace token. Nothing calls the Console
//!    API before this step succeeds.
//! 3. **Deletion**: resources marked for deletion run the deletion guard protocol.
//! 4. **Classify**: read-only (adopted) or managed. Once recorded, the
//!    classification never changes.
//! 5. **Drift**: fingerprint the attributes and create, update or only
//!    re-read the remote object.
//! 6. **Report** conditions and requeue.
//!
//! Errors are recorded on the `Synchronized` condition and returned, the
//! error policy decides when to retry.

use crate::config::ControllerConfig;
use crate::console::{ConsoleClient, ConsoleSession, RemoteError};
use crate::constants::STATUS_WRITE_ATTEMPTS;
use crate::credentials::NamespaceCredentialsCache;
use crate::crd::{ConditionStatus, ConditionType, DeletionGuard, Reconciliation, SyncStatus};
use crate::engine::conditions::{
    ConditionReporter, MESSAGE_DEFAULT_CREDENTIALS, MESSAGE_NOT_FOUND, MESSAGE_READONLY,
    REASON_DEFAULT_CREDENTIALS, REASON_ERROR, REASON_NAMESPACED_CREDENTIALS, REASON_NOT_FOUND,
    REASON_READONLY, REASON_READY, REASON_SYNCHRONIZED,
};
use crate::engine::interval::jitter;
use crate::engine::record::{RecordStore, StoreError, SyncedResource};
use crate::engine::syncable::{RemoteObject, Syncable};
use crate::engine::types::{ReconcileError, ReconcileKey, ReconcileOutcome, SyncError};
use crate::hash::hash_object;
use crate::observability::metrics;
use kube::Resource;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timing settings of an engine
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Requeue after a successful pass, unless the resource overrides it
    pub requeue_interval: Duration,
    /// Requeue while waiting for a dependency or a remote deletion
    pub wait_for_resources: Duration,
    /// Bound of every Console API call
    pub remote_timeout: Duration,
}

impl From<&ControllerConfig> for EngineSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            requeue_interval: config.requeue_interval(),
            wait_for_resources: config.wait_for_resources(),
            remote_timeout: config.remote_timeout(),
        }
    }
}

/// State of one reconciliation pass
#[derive(Debug)]
pub(crate) struct Pass<K> {
    pub key: ReconcileKey,
    pub record: K,
    pub status: SyncStatus,
    pub reporter: ConditionReporter,
}

pub struct Engine<S: Syncable> {
    pub(crate) adapter: S,
    pub(crate) store: Arc<dyn RecordStore<S::Resource>>,
    credentials: Arc<NamespaceCredentialsCache>,
    console: ConsoleClient,
    pub(crate) settings: EngineSettings,
}

impl<S: Syncable> std::fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("kind", &S::KIND)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<S: Syncable> Engine<S> {
    pub fn new(
        adapter: S,
        store: Arc<dyn RecordStore<S::Resource>>,
        credentials: Arc<NamespaceCredentialsCache>,
        console: ConsoleClient,
        settings: EngineSettings,
    ) -> Self {
        Self {
            adapter,
            store,
            credentials,
            console,
            settings,
        }
    }

    pub fn adapter(&self) -> &S {
        &self.adapter
    }

    /// Reconcile the resource identified by `key`
    ///
    /// # Errors
    ///
    /// Returns the first error that stopped the pass. It has already been
    /// recorded on the resource status when the status could be written.
    pub async fn reconcile(&self, key: &ReconcileKey) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(record) = self.store.get(&key.namespace, &key.name).await? else {
            debug!("{} no longer exists", key);
            return Ok(ReconcileOutcome::done());
        };

        let mut pass = Pass {
            key: key.clone(),
            status: record.sync_status().cloned().unwrap_or_default(),
            reporter: ConditionReporter::new(record.meta().generation),
            record,
        };

        let session = match self.credentials.resolve(&key.namespace) {
            Ok(credentials) => {
                let (reason, message) = match &credentials.claim {
                    Some(claim) => (
                        REASON_NAMESPACED_CREDENTIALS,
                        format!("Using {claim} namespace credentials"),
                    ),
                    None => (REASON_DEFAULT_CREDENTIALS, MESSAGE_DEFAULT_CREDENTIALS.to_string()),
                };
                pass.reporter.set(
                    &mut pass.status.conditions,
                    ConditionType::CredentialsInUse,
                    ConditionStatus::True,
                    reason,
                    message,
                );
                self.console.session(&credentials.token)
            }
            Err(e) => {
                warn!("Failed to use namespace credentials for {}: {}", key, e);
                pass.reporter.set(
                    &mut pass.status.conditions,
                    ConditionType::CredentialsInUse,
                    ConditionStatus::False,
                    REASON_ERROR,
                    e.to_string(),
                );
                return self.fail(pass, ReconcileError::credentials(e)).await;
            }
        };

        if pass.record.is_deleting() {
            return self.handle_delete(pass, &session).await;
        }

        let readonly = match pass.status.readonly_condition() {
            Some(condition) => condition.status == ConditionStatus::True,
            None => match self.classify(&pass, &session).await {
                Ok(readonly) => readonly,
                Err(e) => return self.fail(pass, e.into()).await,
            },
        };

        if readonly {
            return self.sync_readonly(pass, &session).await;
        }
        self.sync_managed(pass, &session).await
    }

    /// Decide whether a resource without a recorded classification adopts an existing object
    async fn classify(
        &self,
        pass: &Pass<S::Resource>,
        session: &ConsoleSession,
    ) -> Result<bool, RemoteError> {
        if pass.status.has_id() || pass.status.guard.holds() || !self.adapter.supports_adoption() {
            return Ok(false);
        }
        let key = self.adapter.natural_key(&pass.record);
        let existing = self
            .remote("fetch_by_natural_key", self.adapter.fetch_by_natural_key(session, &key))
            .await?;
        if existing.is_some() {
            info!("{} already exists in the Console API, running in read-only mode", pass.key);
        }
        Ok(existing.is_some())
    }

    /// Mirror an adopted object without ever mutating it
    async fn sync_readonly(
        &self,
        mut pass: Pass<S::Resource>,
        session: &ConsoleSession,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        pass.reporter.set(
            &mut pass.status.conditions,
            ConditionType::Readonly,
            ConditionStatus::True,
            REASON_READONLY,
            MESSAGE_READONLY,
        );

        let key = self.adapter.natural_key(&pass.record);
        let existing = match self
            .remote("fetch_by_natural_key", self.adapter.fetch_by_natural_key(session, &key))
            .await
        {
            Ok(existing) => existing,
            Err(e) => return self.fail(pass, e.into()).await,
        };

        match existing {
            Some(remote) => {
                pass.status.id = Some(remote.id().to_string());
                self.report_synchronized(&mut pass, &remote);
            }
            None => {
                pass.status.id = None;
                pass.status.message = None;
                self.report_not_found(&mut pass);
            }
        }
        self.finish(pass).await
    }

    /// Create, update or verify a managed object
    async fn sync_managed(
        &self,
        mut pass: Pass<S::Resource>,
        session: &ConsoleSession,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        // Persist the classification and the guard marker before the first create,
        // so a crash right after the create cannot be mistaken for adoption
        if pass.status.readonly_condition().is_none() {
            pass.reporter.set(
                &mut pass.status.conditions,
                ConditionType::Readonly,
                ConditionStatus::False,
                REASON_READONLY,
                "",
            );
            pass.record = self.persist(pass.record, &pass.status).await?;
        }
        if !pass.record.has_guard_marker() {
            pass.record = self.store.set_guard_marker(&pass.record, true).await?;
        }

        let attributes = match self.adapter.attributes(&pass.record).await {
            Ok(attributes) => attributes,
            Err(SyncError::NotReady(message)) => {
                debug!("{} is waiting for a dependency: {}", pass.key, message);
                self.report_error(&mut pass, &message);
                self.persist(pass.record, &pass.status).await?;
                return Ok(ReconcileOutcome::requeue_after(self.settings.wait_for_resources));
            }
            Err(e) => return self.fail(pass, e.into()).await,
        };
        let sha = match hash_object(&attributes) {
            Ok(sha) => sha,
            Err(e) => return self.fail(pass, e.into()).await,
        };

        let id = pass.status.id.clone().filter(|id| !id.is_empty());
        let result = match id {
            Some(id) if pass.status.is_sha_equal(&sha) => {
                debug!("{} is unchanged, verifying remote state", pass.key);
                self.remote("fetch_observed", self.adapter.fetch_observed(session, &id))
                    .await
            }
            Some(id) => {
                info!("Updating {} in the Console API", pass.key);
                self.remote("update", self.adapter.update(session, &id, &attributes))
                    .await
                    .map(Some)
            }
            None => {
                info!("Creating {} in the Console API", pass.key);
                self.create_or_adopt(&pass, session, &attributes).await.map(Some)
            }
        };

        match result {
            Ok(Some(remote)) => {
                pass.status.id = Some(remote.id().to_string());
                pass.status.sha = Some(sha);
                pass.status.guard = DeletionGuard::GuardActive;
                self.report_synchronized(&mut pass, &remote);
                self.finish(pass).await
            }
            Ok(None) | Err(RemoteError::NotFound(_)) => self.deleted_externally(pass).await,
            Err(e) => self.fail(pass, e.into()).await,
        }
    }

    /// Create the object, falling back to the existing one on a duplicate create
    async fn create_or_adopt(
        &self,
        pass: &Pass<S::Resource>,
        session: &ConsoleSession,
        attributes: &S::Attributes,
    ) -> Result<S::Remote, RemoteError> {
        match self.remote("create", self.adapter.create(session, attributes)).await {
            Err(RemoteError::AlreadyExists(message)) => {
                let key = self.adapter.natural_key(&pass.record);
                let existing = self
                    .remote("fetch_by_natural_key", self.adapter.fetch_by_natural_key(session, &key))
                    .await?
                    .ok_or(RemoteError::AlreadyExists(message))?;
                info!(
                    "{} was already created by an earlier attempt, updating it",
                    pass.key
                );
                let id = existing.id().to_string();
                self.remote("update", self.adapter.update(session, &id, attributes))
                    .await
            }
            other => other,
        }
    }

    /// The recorded object no longer exists remotely: forget it and recreate it next pass
    async fn deleted_externally(
        &self,
        mut pass: Pass<S::Resource>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        warn!("{} was deleted from the Console API, it will be recreated", pass.key);
        pass.status.id = None;
        pass.status.sha = None;
        pass.status.message = None;
        pass.status.guard = DeletionGuard::NoGuard;
        self.report_not_found(&mut pass);
        self.persist(pass.record, &pass.status).await?;
        Ok(ReconcileOutcome::requeue_after(self.settings.wait_for_resources))
    }

    fn report_synchronized(&self, pass: &mut Pass<S::Resource>, remote: &S::Remote) {
        let message = remote.message();
        pass.reporter.set(
            &mut pass.status.conditions,
            ConditionType::Synchronized,
            ConditionStatus::True,
            REASON_SYNCHRONIZED,
            "",
        );
        pass.reporter.set(
            &mut pass.status.conditions,
            ConditionType::Ready,
            ConditionStatus::from(remote.is_ready()),
            REASON_READY,
            message.clone().unwrap_or_default(),
        );
        pass.status.message = message;
    }

    fn report_not_found(&self, pass: &mut Pass<S::Resource>) {
        pass.reporter.set(
            &mut pass.status.conditions,
            ConditionType::Synchronized,
            ConditionStatus::False,
            REASON_NOT_FOUND,
            MESSAGE_NOT_FOUND,
        );
        pass.reporter.set(
            &mut pass.status.conditions,
            ConditionType::Ready,
            ConditionStatus::False,
            REASON_NOT_FOUND,
            MESSAGE_NOT_FOUND,
        );
    }

    fn report_error(&self, pass: &mut Pass<S::Resource>, message: &str) {
        pass.reporter.set(
            &mut pass.status.conditions,
            ConditionType::Synchronized,
            ConditionStatus::False,
            REASON_ERROR,
            message,
        );
        pass.reporter.set(
            &mut pass.status.conditions,
            ConditionType::Ready,
            ConditionStatus::False,
            REASON_ERROR,
            message,
        );
    }

    /// Persist the final status of a successful pass and schedule the next one
    async fn finish(&self, mut pass: Pass<S::Resource>) -> Result<ReconcileOutcome, ReconcileError> {
        pass.status.observed_generation = pass.record.meta().generation;
        let requeue = Reconciliation::requeue_after(
            pass.record.reconciliation(),
            self.settings.requeue_interval,
        );
        self.persist(pass.record, &pass.status).await?;
        Ok(ReconcileOutcome::requeue_after(jitter(requeue)))
    }

    /// Record `error` on the status (best effort) and return it
    pub(crate) async fn fail(
        &self,
        mut pass: Pass<S::Resource>,
        error: ReconcileError,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.report_error(&mut pass, &error.to_string());
        if let Err(e) = self.persist(pass.record, &pass.status).await {
            warn!("Failed to record error on {}: {}", pass.key, e);
        }
        Err(error)
    }

    /// Write `status`, re-reading the record and retrying on conflicts
    ///
    /// Skips the write when the stored status already matches.
    pub(crate) async fn persist(
        &self,
        record: S::Resource,
        status: &SyncStatus,
    ) -> Result<S::Resource, StoreError> {
        if record.sync_status() == Some(status) {
            return Ok(record);
        }

        let mut current = record;
        for attempt in 1..=STATUS_WRITE_ATTEMPTS {
            match self.store.write_status(&current, status).await {
                Ok(updated) => return Ok(updated),
                Err(StoreError::Conflict) if attempt < STATUS_WRITE_ATTEMPTS => {
                    debug!(
                        "Status write conflict on {} (attempt {}/{}), re-reading",
                        S::KIND,
                        attempt,
                        STATUS_WRITE_ATTEMPTS
                    );
                    let namespace = current.meta().namespace.clone().unwrap_or_default();
                    let name = current.meta().name.clone().unwrap_or_default();
                    current = self
                        .store
                        .get(&namespace, &name)
                        .await?
                        .ok_or(StoreError::NotFound)?;
                }
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Conflict)
    }

    /// Run one Console API call with a timeout and metrics
    pub(crate) async fn remote<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        metrics::increment_remote_operations(S::KIND, operation);
        let timeout = self.settings.remote_timeout;
        let result = tokio::time::timeout(timeout, call)
            .await
            .unwrap_or(Err(RemoteError::Timeout(timeout)));
        if let Err(e) = &result {
            if !e.is_not_found() {
                metrics::increment_remote_operation_errors(S::KIND, operation);
            }
        }
        result
    }
}
