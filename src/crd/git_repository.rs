//! # GitRepository
//!
//! A Git repository registered with the Console API.

use crate::crd::{Reconciliation, SecretReference, SyncStatus};
use serde::{Deserialize, Serialize};

/// GitRepository Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: deployments.console-sync.io/v1alpha1
/// kind: GitRepository
/// metadata:
///   name: infra
///   namespace: apps
/// spec:
///   url: git@github.com:example/infra.git
///   credentialsRef:
///     name: infra-ssh
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "GitRepository",
    group = "deployments.console-sync.io",
    version = "v1alpha1",
    namespaced,
    status = "SyncStatus",
    shortname = "gitrepo",
    printcolumn = r#"{"name":"Id", "type":"string", "jsonPath":".status.id"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositorySpec {
    /// URL of the repository. Also identifies an existing repository in the Console API.
    pub url: String,
    /// Secret with `privateKey`, `passphrase`, `username` and `password` keys
    /// Only the keys present in the secret are sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_ref: Option<SecretReference>,
    /// Reconciliation settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<Reconciliation>,
}
