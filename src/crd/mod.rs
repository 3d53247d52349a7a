//! # Custom Resource Definitions
//!
//! CRD types for the Console Sync Controller.
//!
//! ## Module Structure
//!
//! - `status.rs` - Sync status, conditions and the deletion guard shared by all kinds
//! - `common.rs` - Shared spec fragments (references, reconciliation settings)
//! - `git_repository.rs`, `infrastructure_stack.rs`, `notification_router.rs` - Synchronized kinds
//! - `namespace_credentials.rs` - Credential claims for the namespace credentials cache

mod common;
mod git_repository;
mod infrastructure_stack;
mod namespace_credentials;
mod notification_router;
mod status;

// Re-export all public types
pub use common::{ObjectReference, Reconciliation, SecretReference};
pub use git_repository::{GitRepository, GitRepositorySpec};
pub use infrastructure_stack::{GitRef, InfrastructureStack, InfrastructureStackSpec, StackType};
pub use namespace_credentials::{
    NamespaceCredentials, NamespaceCredentialsSpec, NamespaceCredentialsStatus,
};
pub use notification_router::{NotificationRouter, NotificationRouterSpec, RouterFilter};
pub use status::{Condition, ConditionStatus, ConditionType, DeletionGuard, SyncStatus};
