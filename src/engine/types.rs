//! # Engine Types
//!
//! Keys, outcomes and errors of a single reconciliation.

use crate::console::RemoteError;
use crate::credentials::CredentialsError;
use crate::engine::record::StoreError;
use crate::hash::HashError;
use kube_runtime::controller::Action;
use std::fmt;
use std::time::Duration;

/// Identity of one reconciliation unit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconcileKey {
    pub namespace: String,
    pub name: String,
    pub kind: &'static str,
}

impl ReconcileKey {
    pub fn new(kind: &'static str, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            kind,
        }
    }
}

impl fmt::Display for ReconcileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// What the dispatcher should do after a successful reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    pub requeue: Option<Duration>,
}

impl ReconcileOutcome {
    pub fn done() -> Self {
        Self { requeue: None }
    }

    pub fn requeue_after(after: Duration) -> Self {
        Self {
            requeue: Some(after),
        }
    }

    pub fn into_action(self) -> Action {
        match self.requeue {
            Some(after) => Action::requeue(after),
            None => Action::await_change(),
        }
    }
}

/// Errors raised while building attributes for the Console API
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A dependency exists but is not synchronized yet
    #[error("{0}")]
    NotReady(String),

    /// The resource cannot be synchronized as written
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("{0}")]
    Remote(#[from] RemoteError),

    #[error("failed to use {claim} namespace credentials: {source}")]
    Credentials {
        claim: String,
        #[source]
        source: CredentialsError,
    },

    #[error("status update failed: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Hash(#[from] HashError),

    #[error("{0}")]
    Sync(#[from] SyncError),
}

impl ReconcileError {
    /// Wrap a credentials error with the name of the claim it came from
    pub fn credentials(error: CredentialsError) -> Self {
        let claim = error.claim().unwrap_or("default").to_string();
        Self::Credentials {
            claim,
            source: error,
        }
    }
}
