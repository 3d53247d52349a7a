//! # Syncable Adapters
//!
//! The per-kind contract the generic engine drives.
//!
//! An adapter knows how to turn a resource into Console API attributes and how
//! to call the Console API for its kind. It holds no reconciliation logic:
//! classification, drift detection, the deletion guard and condition reporting
//! all live in the engine.

use crate::console::{ConsoleSession, RemoteError};
use crate::engine::record::SyncedResource;
use crate::engine::types::SyncError;
use async_trait::async_trait;
use serde::Serialize;

/// An object as observed in the Console API
pub trait RemoteObject: Send + Sync {
    fn id(&self) -> &str;

    /// Whether the Console API already marked the object for deletion
    fn is_deleting(&self) -> bool {
        false
    }

    fn is_ready(&self) -> bool {
        true
    }

    /// Human-readable state reported by the Console API
    fn message(&self) -> Option<String> {
        None
    }
}

#[async_trait]
pub trait Syncable: Send + Sync + 'static {
    type Resource: SyncedResource;
    type Attributes: Serialize + Send + Sync + 'static;
    type Remote: RemoteObject + 'static;

    /// Kind name used in logs, metrics and keys
    const KIND: &'static str;

    /// Key identifying a pre-existing object in the Console API
    fn natural_key(&self, resource: &Self::Resource) -> String;

    /// Whether a pre-existing object may be adopted read-only
    fn supports_adoption(&self) -> bool;

    /// Leave the remote object in place when the resource is deleted
    fn detach_on_delete(&self, _resource: &Self::Resource) -> bool {
        false
    }

    /// Build the attributes sent on create and update
    async fn attributes(&self, resource: &Self::Resource) -> Result<Self::Attributes, SyncError>;

    async fn fetch_observed(
        &self,
        session: &ConsoleSession,
        id: &str,
    ) -> Result<Option<Self::Remote>, RemoteError>;

    async fn fetch_by_natural_key(
        &self,
        session: &ConsoleSession,
        key: &str,
    ) -> Result<Option<Self::Remote>, RemoteError>;

    async fn create(
        &self,
        session: &ConsoleSession,
        attributes: &Self::Attributes,
    ) -> Result<Self::Remote, RemoteError>;

    async fn update(
        &self,
        session: &ConsoleSession,
        id: &str,
        attributes: &Self::Attributes,
    ) -> Result<Self::Remote, RemoteError>;

    async fn delete(&self, session: &ConsoleSession, id: &str) -> Result<(), RemoteError>;

    /// Release the object from the controller without deleting it
    async fn detach(&self, session: &ConsoleSession, id: &str) -> Result<(), RemoteError> {
        self.delete(session, id).await
    }
}
