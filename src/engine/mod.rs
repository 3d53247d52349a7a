//! # Reconciliation Engine
//!
//! One generic engine drives every synchronized resource kind through a
//! per-kind [`Syncable`] adapter.
//!
//! ## Module Structure
//!
//! - `reconcile.rs` - The reconciliation pass (credentials, classification, drift, reporting)
//! - `guard.rs` - Deletion guard protocol
//! - `conditions.rs` - Condition reporting
//! - `record.rs` - Kubernetes access to resource records
//! - `syncable.rs` - Adapter contract implemented by each kind
//! - `interval.rs` - Requeue intervals and jitter
//! - `types.rs` - Keys, outcomes and errors

pub mod conditions;
pub mod guard;
pub mod interval;
pub mod reconcile;
pub mod record;
pub mod syncable;
pub mod types;

pub use conditions::ConditionReporter;
pub use guard::{plan_deletion, DeletionStep, Observed};
pub use reconcile::{Engine, EngineSettings};
pub use record::{KubeRecordStore, RecordStore, StoreError, SyncedResource};
pub use syncable::{RemoteObject, Syncable};
pub use types::{ReconcileError, ReconcileKey, ReconcileOutcome, SyncError};
