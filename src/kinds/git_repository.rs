//! # GitRepository Adapter
//!
//! Registers Git repositories with the Console API. A repository that already
//! exists with the same URL is adopted read-only.

use crate::console::{ConsoleSession, RemoteError};
use crate::credentials::SecretReader;
use crate::crd::{GitRepository, Reconciliation, SyncStatus};
use crate::engine::{RemoteObject, SyncError, Syncable, SyncedResource};
use async_trait::async_trait;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const GIT_REPOSITORY_FIELDS: &str = "id url health error";

/// Health reported for repositories the Console can pull from
const HEALTH_PULLABLE: &str = "PULLABLE";

impl SyncedResource for GitRepository {
    fn sync_status(&self) -> Option<&SyncStatus> {
        self.status.as_ref()
    }

    fn reconciliation(&self) -> Option<&Reconciliation> {
        self.spec.reconciliation.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositoryAttributes {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositoryFragment {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RemoteObject for GitRepositoryFragment {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_ready(&self) -> bool {
        self.health.as_deref() == Some(HEALTH_PULLABLE)
    }

    fn message(&self) -> Option<String> {
        self.error.clone().filter(|e| !e.is_empty())
    }
}

pub struct GitRepositoryAdapter {
    secrets: Arc<dyn SecretReader>,
}

impl std::fmt::Debug for GitRepositoryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepositoryAdapter").finish_non_exhaustive()
    }
}

impl GitRepositoryAdapter {
    pub fn new(secrets: Arc<dyn SecretReader>) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl Syncable for GitRepositoryAdapter {
    type Resource = GitRepository;
    type Attributes = GitRepositoryAttributes;
    type Remote = GitRepositoryFragment;

    const KIND: &'static str = "GitRepository";

    fn natural_key(&self, resource: &GitRepository) -> String {
        resource.spec.url.clone()
    }

    fn supports_adoption(&self) -> bool {
        true
    }

    async fn attributes(&self, resource: &GitRepository) -> Result<GitRepositoryAttributes, SyncError> {
        let mut attributes = GitRepositoryAttributes {
            url: resource.spec.url.clone(),
            private_key: None,
            passphrase: None,
            username: None,
            password: None,
        };
        if attributes.url.trim().is_empty() {
            return Err(SyncError::Invalid("spec.url cannot be empty".to_string()));
        }

        let Some(secret_ref) = &resource.spec.credentials_ref else {
            return Ok(attributes);
        };
        let namespace = resource.namespace().unwrap_or_default();
        let mut data = self.secrets.read_data(secret_ref, &namespace).await?;
        attributes.private_key = data.remove("privateKey");
        attributes.passphrase = data.remove("passphrase");
        attributes.username = data.remove("username");
        attributes.password = data.remove("password");
        Ok(attributes)
    }

    async fn fetch_observed(
        &self,
        session: &ConsoleSession,
        id: &str,
    ) -> Result<Option<GitRepositoryFragment>, RemoteError> {
        session
            .query_field(
                &format!("query GitRepository($id: ID!) {{ gitRepository(id: $id) {{ {GIT_REPOSITORY_FIELDS} }} }}"),
                json!({ "id": id }),
                "gitRepository",
            )
            .await
    }

    async fn fetch_by_natural_key(
        &self,
        session: &ConsoleSession,
        key: &str,
    ) -> Result<Option<GitRepositoryFragment>, RemoteError> {
        session
            .query_field(
                &format!("query GitRepositoryByUrl($url: String!) {{ gitRepository(url: $url) {{ {GIT_REPOSITORY_FIELDS} }} }}"),
                json!({ "url": key }),
                "gitRepository",
            )
            .await
    }

    async fn create(
        &self,
        session: &ConsoleSession,
        attributes: &GitRepositoryAttributes,
    ) -> Result<GitRepositoryFragment, RemoteError> {
        session
            .mutate_field(
                &format!("mutation CreateGitRepository($attributes: GitAttributes!) {{ createGitRepository(attributes: $attributes) {{ {GIT_REPOSITORY_FIELDS} }} }}"),
                json!({ "attributes": attributes }),
                "createGitRepository",
            )
            .await
    }

    async fn update(
        &self,
        session: &ConsoleSession,
        id: &str,
        attributes: &GitRepositoryAttributes,
    ) -> Result<GitRepositoryFragment, RemoteError> {
        session
            .mutate_field(
                &format!("mutation UpdateGitRepository($id: ID!, $attributes: GitAttributes!) {{ updateGitRepository(id: $id, attributes: $attributes) {{ {GIT_REPOSITORY_FIELDS} }} }}"),
                json!({ "id": id, "attributes": attributes }),
                "updateGitRepository",
            )
            .await
    }

    async fn delete(&self, session: &ConsoleSession, id: &str) -> Result<(), RemoteError> {
        session
            .execute(
                "mutation DeleteGitRepository($id: ID!) { deleteGitRepository(id: $id) { id } }",
                json!({ "id": id }),
            )
            .await
            .map(|_| ())
    }
}
