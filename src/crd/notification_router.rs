//! # NotificationRouter
//!
//! Routes Console events matching filters to notification sinks.

use crate::crd::{Reconciliation, SyncStatus};
use serde::{Deserialize, Serialize};

/// NotificationRouter Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: deployments.console-sync.io/v1alpha1
/// kind: NotificationRouter
/// metadata:
///   name: deploys
///   namespace: apps
/// spec:
///   events: ["service.update"]
///   filters:
///     - regex: "prod-.*"
///   sinks: ["2c7e9a4b"]
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "NotificationRouter",
    group = "deployments.console-sync.io",
    version = "v1alpha1",
    namespaced,
    status = "SyncStatus",
    printcolumn = r#"{"name":"Id", "type":"string", "jsonPath":".status.id"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRouterSpec {
    /// Router name in the Console API. Also identifies an existing router.
    /// Default: `metadata.name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Event names to route. Use `*` for every event.
    #[serde(default)]
    pub events: Vec<String>,
    /// Filters narrowing the routed events
    #[serde(default)]
    pub filters: Vec<RouterFilter>,
    /// IDs of the notification sinks receiving events
    #[serde(default)]
    pub sinks: Vec<String>,
    /// Reconciliation settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<Reconciliation>,
}

/// Event filter. Every field that is set must match.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouterFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
}
