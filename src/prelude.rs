//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use console_sync_controller::prelude::*;
//! ```

// CRD types - most commonly used
pub use crate::crd::*;

// Engine - the reconciliation contract and its driver
pub use crate::engine::{
    Engine, EngineSettings, KubeRecordStore, ReconcileError, ReconcileKey, ReconcileOutcome,
    RecordStore, RemoteObject, StoreError, SyncError, Syncable, SyncedResource,
};

// Namespace credentials
pub use crate::credentials::{
    CredentialsClaim, CredentialsError, NamespaceCredentialsCache, ResolvedCredentials, Token,
};

// Console API client
pub use crate::console::{ConsoleClient, ConsoleSession, RemoteError};

// Resource kind adapters
pub use crate::kinds::{
    GitRepositoryAdapter, InfrastructureStackAdapter, NotificationRouterAdapter, ResourceKind,
};

// Config types - for configuration management
pub use crate::config::ControllerConfig;
