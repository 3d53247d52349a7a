//! # Resource Records
//!
//! Access to the Kubernetes side of a synchronized resource: fetching it,
//! writing its status and toggling the deletion guard finalizer.

use crate::constants::REMOTE_PROTECTION_FINALIZER;
use crate::crd::{Reconciliation, SyncStatus};
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Debug;
use std::marker::PhantomData;

/// A namespaced custom resource carrying a [`SyncStatus`]
pub trait SyncedResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    fn sync_status(&self) -> Option<&SyncStatus>;

    fn reconciliation(&self) -> Option<&Reconciliation>;

    fn is_deleting(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }

    fn has_guard_marker(&self) -> bool {
        self.finalizers()
            .iter()
            .any(|f| f == REMOTE_PROTECTION_FINALIZER)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("resource not found")]
    NotFound,

    /// The record changed since it was read
    #[error("resource version conflict")]
    Conflict,

    #[error("Kubernetes API error: {0}")]
    Kube(#[source] kube::Error),

    #[error("failed to serialize status: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<kube::Error> for StoreError {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(api_err) if api_err.code == 404 => Self::NotFound,
            kube::Error::Api(api_err) if api_err.code == 409 => Self::Conflict,
            other => Self::Kube(other),
        }
    }
}

/// Storage of resource records
#[async_trait]
pub trait RecordStore<K>: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError>;

    /// Replace the status, failing with [`StoreError::Conflict`] if the record
    /// changed since it was read
    async fn write_status(&self, record: &K, status: &SyncStatus) -> Result<K, StoreError>;

    /// Add or remove the deletion guard finalizer
    async fn set_guard_marker(&self, record: &K, present: bool) -> Result<K, StoreError>;
}

/// Record store backed by the Kubernetes API
pub struct KubeRecordStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Debug for KubeRecordStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeRecordStore").finish_non_exhaustive()
    }
}

impl<K> Clone for KubeRecordStore<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: SyncedResource> KubeRecordStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }

    fn api(&self, record: &K) -> Api<K> {
        Api::namespaced(
            self.client.clone(),
            record.namespace().as_deref().unwrap_or_default(),
        )
    }
}

#[async_trait]
impl<K: SyncedResource> RecordStore<K> for KubeRecordStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn write_status(&self, record: &K, status: &SyncStatus) -> Result<K, StoreError> {
        let patch = json!({
            "metadata": { "resourceVersion": record.resource_version() },
            "status": status_patch(status)?,
        });
        Ok(self
            .api(record)
            .patch_status(&record.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?)
    }

    async fn set_guard_marker(&self, record: &K, present: bool) -> Result<K, StoreError> {
        if record.has_guard_marker() == present {
            return Ok(record.clone());
        }
        let mut finalizers: Vec<String> = record
            .finalizers()
            .iter()
            .filter(|f| *f != REMOTE_PROTECTION_FINALIZER)
            .cloned()
            .collect();
        if present {
            finalizers.push(REMOTE_PROTECTION_FINALIZER.to_string());
        }
        let patch = json!({
            "metadata": {
                "resourceVersion": record.resource_version(),
                "finalizers": finalizers,
            }
        });
        Ok(self
            .api(record)
            .patch(&record.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?)
    }
}

/// Merge-patch body for a status
///
/// Optional fields are written as explicit nulls so clearing them removes them.
pub fn status_patch(status: &SyncStatus) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(status)?;
    if let Some(object) = value.as_object_mut() {
        for key in ["id", "sha", "message", "observedGeneration"] {
            object.entry(key).or_insert(Value::Null);
        }
    }
    Ok(value)
}
