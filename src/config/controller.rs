//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::kinds::ResourceKind;
use anyhow::{anyhow, Result};
use std::time::Duration;

/// Controller-level configuration
///
/// All settings except the Console URL have sensible defaults and can be
/// overridden via environment variables. Environment variables are populated
/// from a ConfigMap using `envFrom` in the deployment.
#[derive(Clone)]
pub struct ControllerConfig {
    /// Base URL of the Console API (e.g. `https://console.example.com`)
    pub console_url: String,
    /// Token used for namespaces without a NamespaceCredentials claim
    pub console_token: String,
    /// How long to wait before re-verifying a reconciled resource (seconds)
    pub requeue_interval_secs: u64,
    /// How long to wait before retrying when a dependency is not ready (seconds)
    pub wait_for_resources_secs: u64,
    /// Reconciliation error requeue interval (seconds)
    /// How long to wait before retrying a failed reconciliation
    pub reconciliation_error_requeue_secs: u64,
    /// Timeout applied to every Console API call (seconds)
    pub remote_timeout_secs: u64,
    /// Maximum concurrent reconciliations per resource kind
    pub max_concurrent_reconciliations: u16,
    /// Port of the metrics and probes server
    pub metrics_port: u16,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Resource kinds whose controllers are started
    pub reconcilers: Vec<ResourceKind>,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("console_url", &self.console_url)
            .field("console_token", &"***")
            .field("requeue_interval_secs", &self.requeue_interval_secs)
            .field("wait_for_resources_secs", &self.wait_for_resources_secs)
            .field(
                "reconciliation_error_requeue_secs",
                &self.reconciliation_error_requeue_secs,
            )
            .field("remote_timeout_secs", &self.remote_timeout_secs)
            .field(
                "max_concurrent_reconciliations",
                &self.max_concurrent_reconciliations,
            )
            .field("metrics_port", &self.metrics_port)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("reconcilers", &self.reconcilers)
            .finish()
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            console_url: String::new(),
            console_token: String::new(),
            requeue_interval_secs: DEFAULT_REQUEUE_INTERVAL_SECS,
            wait_for_resources_secs: DEFAULT_WAIT_FOR_RESOURCES_SECS,
            reconciliation_error_requeue_secs: DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            remote_timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            reconcilers: ResourceKind::all().to_vec(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// # Errors
    ///
    /// Returns an error if `RECONCILERS` names an unknown resource kind.
    pub fn from_env() -> Result<Self> {
        use crate::constants::*;
        let reconcilers = match std::env::var("RECONCILERS") {
            Ok(value) if !value.trim().is_empty() => parse_reconcilers(&value)?,
            _ => ResourceKind::all().to_vec(),
        };

        Ok(Self {
            console_url: env_var_or_default_str("CONSOLE_URL", ""),
            console_token: env_var_or_default_str("CONSOLE_TOKEN", ""),
            requeue_interval_secs: env_var_or_default(
                "REQUEUE_INTERVAL_SECS",
                DEFAULT_REQUEUE_INTERVAL_SECS,
            ),
            wait_for_resources_secs: env_var_or_default(
                "WAIT_FOR_RESOURCES_SECS",
                DEFAULT_WAIT_FOR_RESOURCES_SECS,
            ),
            reconciliation_error_requeue_secs: env_var_or_default(
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            ),
            remote_timeout_secs: env_var_or_default(
                "REMOTE_TIMEOUT_SECS",
                DEFAULT_REMOTE_TIMEOUT_SECS,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
            reconcilers,
        })
    }

    /// Check that the configuration can run a controller
    ///
    /// # Errors
    ///
    /// Returns an error if the Console URL is missing, an interval is zero
    /// or no reconciler is enabled.
    pub fn validate(&self) -> Result<()> {
        if self.console_url.trim().is_empty() {
            return Err(anyhow!("CONSOLE_URL must be set"));
        }
        if !self.console_url.starts_with("http://") && !self.console_url.starts_with("https://") {
            return Err(anyhow!(
                "CONSOLE_URL must be an http(s) URL, got '{}'",
                self.console_url
            ));
        }
        for (name, value) in [
            ("REQUEUE_INTERVAL_SECS", self.requeue_interval_secs),
            ("WAIT_FOR_RESOURCES_SECS", self.wait_for_resources_secs),
            (
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                self.reconciliation_error_requeue_secs,
            ),
            ("REMOTE_TIMEOUT_SECS", self.remote_timeout_secs),
        ] {
            if value == 0 {
                return Err(anyhow!("{name} must be greater than 0"));
            }
        }
        if self.max_concurrent_reconciliations == 0 {
            return Err(anyhow!("MAX_CONCURRENT_RECONCILIATIONS must be greater than 0"));
        }
        if self.reconcilers.is_empty() {
            return Err(anyhow!("RECONCILERS must enable at least one resource kind"));
        }
        Ok(())
    }

    /// Get the default requeue duration
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_secs)
    }

    /// Get the wait-for-resources requeue duration
    pub fn wait_for_resources(&self) -> Duration {
        Duration::from_secs(self.wait_for_resources_secs)
    }

    /// Get reconciliation error requeue duration
    pub fn reconciliation_error_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.reconciliation_error_requeue_secs)
    }

    /// Get the Console API call timeout
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    /// Whether the controller for `kind` should be started
    pub fn is_enabled(&self, kind: ResourceKind) -> bool {
        self.reconcilers.contains(&kind)
    }
}

/// Parse a comma-delimited list of reconciler names
///
/// # Errors
///
/// Returns an error naming the first unknown reconciler.
pub fn parse_reconcilers(value: &str) -> Result<Vec<ResourceKind>> {
    let mut kinds = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind: ResourceKind = name.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        return Err(anyhow!("reconcilers list cannot be empty"));
    }
    Ok(kinds)
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ControllerConfig {
        ControllerConfig {
            console_url: "https://console.example.com".to_string(),
            ..ControllerConfig::default()
        }
    }

    #[test]
    fn test_default_config_enables_every_reconciler() {
        let config = ControllerConfig::default();
        for kind in ResourceKind::all() {
            assert!(config.is_enabled(*kind));
        }
        assert_eq!(config.requeue_interval(), Duration::from_secs(30));
        assert_eq!(config.wait_for_resources(), Duration::from_secs(5));
    }

    #[test]
    fn test_validate_requires_console_url() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let config = ControllerConfig {
            console_url: "console.example.com".to_string(),
            ..ControllerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = ControllerConfig {
            requeue_interval_secs: 0,
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("REQUEUE_INTERVAL_SECS"));
    }

    #[test]
    fn test_parse_reconcilers() {
        let kinds = parse_reconcilers("gitrepository, notificationrouter,gitrepository").unwrap();
        assert_eq!(
            kinds,
            vec![ResourceKind::GitRepository, ResourceKind::NotificationRouter]
        );
    }

    #[test]
    fn test_parse_reconcilers_rejects_unknown_and_empty() {
        assert!(parse_reconcilers("gitrepository,cluster").is_err());
        assert!(parse_reconcilers(" , ").is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ControllerConfig {
            console_token: "super-secret".to_string(),
            ..valid()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
    }
}
