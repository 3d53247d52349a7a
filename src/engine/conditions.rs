//! # Condition Reporting
//!
//! Upserts typed conditions on a resource status.

use crate::crd::{Condition, ConditionStatus, ConditionType};
use chrono::{SecondsFormat, Utc};

pub const REASON_READY: &str = "Ready";
pub const REASON_SYNCHRONIZED: &str = "Synchronized";
pub const REASON_ERROR: &str = "Error";
pub const REASON_NOT_FOUND: &str = "NotFound";
pub const REASON_DELETING: &str = "Deleting";
pub const REASON_READONLY: &str = "Readonly";
pub const REASON_NAMESPACED_CREDENTIALS: &str = "NamespacedCredentials";
pub const REASON_DEFAULT_CREDENTIALS: &str = "DefaultCredentials";

pub const MESSAGE_READONLY: &str = "Running in read-only mode";
pub const MESSAGE_NOT_FOUND: &str = "Could not find resource in Console API";
pub const MESSAGE_DEFAULT_CREDENTIALS: &str = "Using default credentials";

/// Sets conditions for one reconciliation of a given generation
#[derive(Debug, Clone, Copy)]
pub struct ConditionReporter {
    generation: Option<i64>,
}

impl ConditionReporter {
    pub fn new(generation: Option<i64>) -> Self {
        Self { generation }
    }

    pub fn set(
        &self,
        conditions: &mut Vec<Condition>,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
    ) {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.set_at(conditions, condition_type, status, reason, message, &now);
    }

    /// Upsert by type. `lastTransitionTime` only moves when the status flips.
    pub fn set_at(
        &self,
        conditions: &mut Vec<Condition>,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
        now: &str,
    ) {
        let message = message.into();
        if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
            if existing.status != status {
                existing.last_transition_time = now.to_string();
            }
            existing.status = status;
            existing.reason = reason.to_string();
            existing.message = message;
            existing.observed_generation = self.generation;
            return;
        }

        conditions.push(Condition {
            r#type: condition_type,
            status,
            reason: reason.to_string(),
            message,
            observed_generation: self.generation,
            last_transition_time: now.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_inserts_once_per_type() {
        let reporter = ConditionReporter::new(Some(1));
        let mut conditions = Vec::new();
        reporter.set_at(
            &mut conditions,
            ConditionType::Ready,
            ConditionStatus::False,
            REASON_READY,
            "",
            "2024-01-01T00:00:00Z",
        );
        reporter.set_at(
            &mut conditions,
            ConditionType::Ready,
            ConditionStatus::False,
            REASON_ERROR,
            "boom",
            "2024-01-01T00:01:00Z",
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].reason, REASON_ERROR);
        assert_eq!(conditions[0].message, "boom");
        assert_eq!(conditions[0].last_transition_time, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_transition_time_moves_on_status_flip() {
        let mut conditions = Vec::new();
        ConditionReporter::new(Some(1)).set_at(
            &mut conditions,
            ConditionType::Synchronized,
            ConditionStatus::False,
            REASON_ERROR,
            "",
            "2024-01-01T00:00:00Z",
        );
        ConditionReporter::new(Some(2)).set_at(
            &mut conditions,
            ConditionType::Synchronized,
            ConditionStatus::True,
            REASON_SYNCHRONIZED,
            "",
            "2024-01-01T00:05:00Z",
        );

        assert_eq!(conditions[0].status, ConditionStatus::True);
        assert_eq!(conditions[0].last_transition_time, "2024-01-01T00:05:00Z");
        assert_eq!(conditions[0].observed_generation, Some(2));
    }
}
