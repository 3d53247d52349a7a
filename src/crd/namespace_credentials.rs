//! # NamespaceCredentials
//!
//! Cluster-scoped claim routing a set of namespaces to a Console API token.

use crate::crd::{Condition, SecretReference};
use serde::{Deserialize, Serialize};

/// NamespaceCredentials Custom Resource Definition
///
/// Every resource in one of `namespaces` talks to the Console API with the
/// token stored under the `token` key of the referenced secret.
///
/// # Example
///
/// ```yaml
/// apiVersion: deployments.console-sync.io/v1alpha1
/// kind: NamespaceCredentials
/// metadata:
///   name: team-a
/// spec:
///   namespaces: ["team-a-dev", "team-a-prod"]
///   secretRef:
///     name: team-a-console-token
///     namespace: console-sync
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "NamespaceCredentials",
    group = "deployments.console-sync.io",
    version = "v1alpha1",
    status = "NamespaceCredentialsStatus",
    shortname = "nscreds",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceCredentialsSpec {
    /// Namespaces using these credentials
    pub namespaces: Vec<String>,
    /// Secret holding the token
    /// Default namespace: `default`
    pub secret_ref: SecretReference,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceCredentialsStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
