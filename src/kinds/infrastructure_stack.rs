//! # InfrastructureStack Adapter
//!
//! Manages infrastructure stacks. Stacks are never adopted, and a stack can be
//! detached instead of deleted when its resource goes away.

use crate::console::{ConsoleSession, RemoteError};
use crate::crd::{GitRef, GitRepository, InfrastructureStack, Reconciliation, StackType, SyncStatus};
use crate::engine::{RecordStore, RemoteObject, SyncError, Syncable, SyncedResource};
use async_trait::async_trait;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const STACK_FIELDS: &str = "id name status deletedAt";

/// Status of a stack whose last run succeeded
const STATUS_SUCCESSFUL: &str = "SUCCESSFUL";

impl SyncedResource for InfrastructureStack {
    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref()
    }

    fn reconciliation(&self) -> Option<&Reconciliation> {
        self.spec.reconciliation.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackAttributes {
    pub name: String,
    pub r#type: StackType,
    pub repository_id: String,
    pub cluster_id: String,
    pub git: GitRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_state: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStackFragment {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

impl RemoteObject for InfrastructureStackFragment {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_deleting(&self) -> bool {
        self.deleted_at.is_some()
    }

    fn is_ready(&self) -> bool {
        self.status.as_deref() == Some(STATUS_SUCCESSFUL)
    }

    fn message(&self) -> Option<String> {
        self.status.clone()
    }
}

pub struct InfrastructureStackAdapter {
    repositories: Arc<dyn RecordStore<GitRepository>>,
}

impl std::fmt::Debug for InfrastructureStackAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfrastructureStackAdapter").finish_non_exhaustive()
    }
}

impl InfrastructureStackAdapter {
    pub fn new(repositories: Arc<dyn RecordStore<GitRepository>>) -> Self {
        Self { repositories }
    }

    fn stack_name(resource: &InfrastructureStack) -> String {
        resource
            .spec
            .name
            .clone()
            .unwrap_or_else(|| resource.name_any())
    }

    /// ID of the referenced GitRepository, once it has been synchronized
    async fn repository_id(&self, resource: &InfrastructureStack) -> Result<String, SyncError> {
        let reference = &resource.spec.repository_ref;
        let namespace = resource.namespace().unwrap_or_default();
        let namespace = reference.namespace_or(&namespace);

        let repository = self
            .repositories
            .get(namespace, &reference.name)
            .await?
            .ok_or_else(|| {
                SyncError::NotReady(format!(
                    "GitRepository {namespace}/{} not found",
                    reference.name
                ))
            })?;

        repository
            .status
            .as_ref()
            .and_then(|status| status.id.clone())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                SyncError::NotReady(format!(
                    "GitRepository {namespace}/{} is not synchronized yet",
                    reference.name
                ))
            })
    }
}

#[async_trait]
impl Syncable for InfrastructureStackAdapter {
    type Resource = InfrastructureStack;
    type Attributes = StackAttributes;
    type Remote = InfrastructureStackFragment;

    const KIND: &'static str = "InfrastructureStack";

    fn natural_key(&self, resource: &InfrastructureStack) -> String {
        Self::stack_name(resource)
    }

    fn supports_adoption(&self) -> bool {
        false
    }

    fn detach_on_delete(&self, resource: &InfrastructureStack) -> bool {
        resource.spec.detach
    }

    async fn attributes(&self, resource: &InfrastructureStack) -> Result<StackAttributes, SyncError> {
        if resource.spec.cluster.trim().is_empty() {
            return Err(SyncError::Invalid("spec.cluster cannot be empty".to_string()));
        }
        let repository_id = self.repository_id(resource).await?;
        Ok(StackAttributes {
            name: Self::stack_name(resource),
            r#type: resource.spec.r#type,
            repository_id,
            cluster_id: resource.spec.cluster.clone(),
            git: resource.spec.git.clone(),
            manage_state: resource.spec.manage_state,
            approval: resource.spec.approval,
            workdir: resource.spec.workdir.clone(),
        })
    }

    async fn fetch_observed(
        &self,
        session: &ConsoleSession,
        id: &str,
    ) -> Result<Option<InfrastructureStackFragment>, RemoteError> {
        session
            .query_field(
                &format!("query InfrastructureStack($id: ID!) {{ infrastructureStack(id: $id) {{ {STACK_FIELDS} }} }}"),
                json!({ "id": id }),
                "infrastructureStack",
            )
            .await
    }

    /// Stacks cannot be looked up by name
    async fn fetch_by_natural_key(
        &self,
        _session: &ConsoleSession,
        _key: &str,
    ) -> Result<Option<InfrastructureStackFragment>, RemoteError> {
        Ok(None)
    }

    async fn create(
        &self,
        session: &ConsoleSession,
        attributes: &StackAttributes,
    ) -> Result<InfrastructureStackFragment, RemoteError> {
        session
            .mutate_field(
                &format!("mutation CreateStack($attributes: StackAttributes!) {{ createStack(attributes: $attributes) {{ {STACK_FIELDS} }} }}"),
                json!({ "attributes": attributes }),
                "createStack",
            )
            .await
    }

    async fn update(
        &self,
        session: &ConsoleSession,
        id: &str,
        attributes: &StackAttributes,
    ) -> Result<InfrastructureStackFragment, RemoteError> {
        session
            .mutate_field(
                &format!("mutation UpdateStack($id: ID!, $attributes: StackAttributes!) {{ updateStack(id: $id, attributes: $attributes) {{ {STACK_FIELDS} }} }}"),
                json!({ "id": id, "attributes": attributes }),
                "updateStack",
            )
            .await
    }

    async fn delete(&self, session: &ConsoleSession, id: &str) -> Result<(), RemoteError> {
        session
            .execute(
                "mutation DeleteStack($id: ID!) { deleteStack(id: $id) { id } }",
                json!({ "id": id }),
            )
            .await
            .map(|_| ())
    }

    async fn detach(&self, session: &ConsoleSession, id: &str) -> Result<(), RemoteError> {
        session
            .execute(
                "mutation DetachStack($id: ID!) { detachStack(id: $id) { id } }",
                json!({ "id": id }),
            )
            .await
            .map(|_| ())
    }
}
