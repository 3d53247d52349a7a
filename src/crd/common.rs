//! # Common Types
//!
//! Spec fragments shared by several custom resources.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-resource reconciliation settings
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// How often the resource is re-verified against the Console API
    /// Format: Kubernetes duration string (e.g., "30s", "5m", "1h")
    /// Default: controller-wide `REQUEUE_INTERVAL_SECS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

impl Reconciliation {
    /// Requeue interval for this resource, falling back to `default` when unset or invalid
    pub fn requeue_after(reconciliation: Option<&Self>, default: Duration) -> Duration {
        let Some(interval) = reconciliation.and_then(|r| r.interval.as_deref()) else {
            return default;
        };
        match crate::engine::interval::parse_kubernetes_duration(interval) {
            Ok(duration) => duration,
            Err(e) => {
                tracing::warn!(
                    "Invalid reconciliation interval '{}': {}, using default {:?}",
                    interval,
                    e,
                    default
                );
                default
            }
        }
    }
}

/// Reference to a Secret holding credentials
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    /// Secret name
    pub name: String,
    /// Secret namespace
    /// Default: the namespace of the referencing resource, or `default` for cluster-scoped ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Reference to another custom resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// Resource name
    pub name: String,
    /// Resource namespace
    /// Default: the namespace of the referencing resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ObjectReference {
    /// Namespace of the referenced object, defaulting to `fallback`
    pub fn namespace_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requeue_after_uses_override() {
        let reconciliation = Reconciliation {
            interval: Some("5m".to_string()),
        };
        assert_eq!(
            Reconciliation::requeue_after(Some(&reconciliation), Duration::from_secs(30)),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn test_requeue_after_falls_back_on_invalid_or_missing() {
        let default = Duration::from_secs(30);
        let invalid = Reconciliation {
            interval: Some("soon".to_string()),
        };
        assert_eq!(Reconciliation::requeue_after(Some(&invalid), default), default);
        assert_eq!(
            Reconciliation::requeue_after(Some(&Reconciliation::default()), default),
            default
        );
        assert_eq!(Reconciliation::requeue_after(None, default), default);
    }

    #[test]
    fn test_object_reference_namespace_fallback() {
        let reference = ObjectReference {
            name: "repo".to_string(),
            namespace: None,
        };
        assert_eq!(reference.namespace_or("apps"), "apps");
    }
}
