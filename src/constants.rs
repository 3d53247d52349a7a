//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// API group of every custom resource managed by the controller
pub const API_GROUP: &str = "deployments.console-sync.io";

/// Field manager name used for status and metadata patches
pub const FIELD_MANAGER: &str = "console-sync-controller";

/// Finalizer backing the deletion guard of synchronized resources
pub const REMOTE_PROTECTION_FINALIZER: &str = "deployments.console-sync.io/remote-protection";

/// Finalizer that keeps a NamespaceCredentials claim until the cache forgot it
pub const CREDENTIALS_FINALIZER: &str = "deployments.console-sync.io/credentials-protection";

/// Secret data key holding the Console API token
pub const CREDENTIALS_TOKEN_KEY: &str = "token";

/// Namespace used when a secret reference does not name one
pub const DEFAULT_SECRET_NAMESPACE: &str = "default";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default requeue interval after a reconciliation (seconds)
/// Remote state can change independently, so every record is re-verified
pub const DEFAULT_REQUEUE_INTERVAL_SECS: u64 = 30;

/// Default requeue interval while waiting for a dependency (seconds)
pub const DEFAULT_WAIT_FOR_RESOURCES_SECS: u64 = 5;

/// Default requeue interval for reconciliation errors (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 30;

/// Default timeout for a single Console API call (seconds)
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Default number of reconciliations run in parallel per resource kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// How many times a conflicting status write is retried against a fresh record
pub const STATUS_WRITE_ATTEMPTS: usize = 5;

/// Path of the GraphQL endpoint relative to the Console URL
pub const CONSOLE_GRAPHQL_PATH: &str = "/gql";
