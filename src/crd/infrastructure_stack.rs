//! # InfrastructureStack
//!
//! An infrastructure-as-code stack run by the Console API against a GitRepository.

use crate::crd::{ObjectReference, Reconciliation, SyncStatus};
use serde::{Deserialize, Serialize};

/// InfrastructureStack Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: deployments.console-sync.io/v1alpha1
/// kind: InfrastructureStack
/// metadata:
///   name: network
///   namespace: apps
/// spec:
///   type: TERRAFORM
///   repositoryRef:
///     name: infra
///   cluster: 9f3c1e0a
///   git:
///     ref: main
///     folder: terraform/network
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "InfrastructureStack",
    group = "deployments.console-sync.io",
    version = "v1alpha1",
    namespaced,
    status = "SyncStatus",
    shortname = "stack",
    printcolumn = r#"{"name":"Id", "type":"string", "jsonPath":".status.id"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStackSpec {
    /// Stack name in the Console API
    /// Default: `metadata.name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Stack type (TERRAFORM, ANSIBLE, CUSTOM)
    pub r#type: StackType,
    /// GitRepository holding the stack sources
    pub repository_ref: ObjectReference,
    /// ID of the cluster the stack runs on
    pub cluster: String,
    /// Location of the stack inside the repository
    pub git: GitRef,
    /// Whether the Console API manages the stack state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manage_state: Option<bool>,
    /// Whether runs require manual approval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<bool>,
    /// Working directory override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    /// Leave the stack in the Console API when this resource is deleted
    #[serde(default)]
    pub detach: bool,
    /// Reconciliation settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<Reconciliation>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackType {
    Terraform,
    Ansible,
    Custom,
}

/// Git location of the stack sources
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitRef {
    /// Branch, tag or commit
    pub r#ref: String,
    /// Folder inside the repository
    pub folder: String,
}
