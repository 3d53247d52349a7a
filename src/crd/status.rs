//! # Sync Status
//!
//! Status shared by every resource kind kept in sync with the Console API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a synchronized resource
///
/// Written exclusively by the controller. Users only write `.spec`.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// ID of the object in the Console API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Fingerprint of the attributes last sent to the Console API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    /// Deletion guard state
    #[serde(default)]
    pub guard: DeletionGuard,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Human-readable message reported by the Console API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Observed generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl SyncStatus {
    pub fn has_id(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Whether `sha` matches the stored fingerprint. A missing fingerprint never matches.
    pub fn is_sha_equal(&self, sha: &str) -> bool {
        self.sha.as_deref() == Some(sha)
    }

    pub fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == condition_type)
    }

    /// The recorded `Readonly` condition, if classification already happened
    pub fn readonly_condition(&self) -> Option<&Condition> {
        self.condition(ConditionType::Readonly)
    }

    /// Whether the resource was classified as read-only
    pub fn is_readonly(&self) -> bool {
        self.readonly_condition()
            .is_some_and(|c| c.status == ConditionStatus::True)
    }

    /// Whether the `Ready` condition is `True`
    pub fn is_ready(&self) -> bool {
        self.condition(ConditionType::Ready)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }
}

/// Deletion guard state machine
///
/// `NoGuard -> GuardActive -> AwaitingRemoteConfirmation -> Released`.
/// Backed by a finalizer on the resource while active or awaiting confirmation.
#[derive(
    Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq, schemars::JsonSchema,
)]
pub enum DeletionGuard {
    /// No remote object was ever created for this resource
    #[default]
    NoGuard,
    /// A remote object exists and must be deleted before the resource goes away
    GuardActive,
    /// Remote deletion was issued and has not been confirmed yet
    AwaitingRemoteConfirmation,
    /// Remote object is confirmed gone
    Released,
}

impl DeletionGuard {
    /// Whether the guard finalizer must stay on the resource
    pub fn holds(self) -> bool {
        matches!(self, Self::GuardActive | Self::AwaitingRemoteConfirmation)
    }
}

impl fmt::Display for DeletionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoGuard => "NoGuard",
            Self::GuardActive => "GuardActive",
            Self::AwaitingRemoteConfirmation => "AwaitingRemoteConfirmation",
            Self::Released => "Released",
        };
        f.write_str(s)
    }
}

/// Condition types reported on synchronized resources
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash, schemars::JsonSchema)]
pub enum ConditionType {
    Ready,
    Synchronized,
    Readonly,
    CredentialsInUse,
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ready => "Ready",
            Self::Synchronized => "Synchronized",
            Self::Readonly => "Readonly",
            Self::CredentialsInUse => "CredentialsInUse",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: ConditionType,
    /// Status of the condition (True, False)
    pub status: ConditionStatus,
    /// Machine-readable reason for the last transition
    pub reason: String,
    /// Message describing the condition
    #[serde(default)]
    pub message: String,
    /// Generation the condition was computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// Last transition time (RFC3339)
    pub last_transition_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(t: ConditionType, s: ConditionStatus) -> Condition {
        Condition {
            r#type: t,
            status: s,
            reason: "Test".to_string(),
            message: String::new(),
            observed_generation: None,
            last_transition_time: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_has_id_ignores_empty_string() {
        let mut status = SyncStatus::default();
        assert!(!status.has_id());
        status.id = Some(String::new());
        assert!(!status.has_id());
        status.id = Some("abc".to_string());
        assert!(status.has_id());
    }

    #[test]
    fn test_missing_sha_never_matches() {
        let mut status = SyncStatus::default();
        assert!(!status.is_sha_equal(""));
        status.sha = Some("x".to_string());
        assert!(status.is_sha_equal("x"));
        assert!(!status.is_sha_equal("y"));
    }

    #[test]
    fn test_readonly_lookup() {
        let mut status = SyncStatus::default();
        assert!(status.readonly_condition().is_none());
        status
            .conditions
            .push(condition(ConditionType::Readonly, ConditionStatus::False));
        assert!(status.readonly_condition().is_some());
        assert!(!status.is_readonly());
        status.conditions[0].status = ConditionStatus::True;
        assert!(status.is_readonly());
    }

    #[test]
    fn test_guard_holds_finalizer() {
        assert!(!DeletionGuard::NoGuard.holds());
        assert!(DeletionGuard::GuardActive.holds());
        assert!(DeletionGuard::AwaitingRemoteConfirmation.holds());
        assert!(!DeletionGuard::Released.holds());
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = SyncStatus {
            id: Some("id-1".to_string()),
            observed_generation: Some(3),
            guard: DeletionGuard::GuardActive,
            ..SyncStatus::default()
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["observedGeneration"], 3);
        assert_eq!(value["guard"], "GuardActive");
        assert!(value.get("sha").is_none());
    }
}
