//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `console_sync_reconciliations_total` - Reconciliations by kind
//! - `console_sync_reconciliation_errors_total` - Failed reconciliations by kind
//! - `console_sync_reconciliation_duration_seconds` - Reconciliation duration by kind
//! - `console_sync_remote_operations_total` - Console API calls by kind and operation
//! - `console_sync_remote_operation_errors_total` - Failed Console API calls by kind and operation
//! - `console_sync_requeues_total` - Requeues by trigger
//! - `console_sync_credentials_conflicts_total` - Namespaces claimed by more than one claim
//! - `console_sync_credentials_entries` - Namespaces currently routed to a claim

use anyhow::Result;
use prometheus::{HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "console_sync_reconciliations_total",
            "Total number of reconciliations by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "console_sync_reconciliation_errors_total",
            "Total number of reconciliation errors by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "console_sync_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds by resource kind",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REMOTE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "console_sync_remote_operations_total",
            "Total number of Console API calls by resource kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create REMOTE_OPERATIONS_TOTAL metric - this should never happen")
});

static REMOTE_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "console_sync_remote_operation_errors_total",
            "Total number of failed Console API calls by resource kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create REMOTE_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "console_sync_requeues_total",
            "Total number of requeues by trigger",
        ),
        &["trigger"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static CREDENTIALS_CONFLICTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "console_sync_credentials_conflicts_total",
        "Total number of namespaces claimed by more than one NamespaceCredentials",
    )
    .expect("Failed to create CREDENTIALS_CONFLICTS_TOTAL metric - this should never happen")
});

static CREDENTIALS_ENTRIES: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "console_sync_credentials_entries",
        "Current number of namespaces routed to NamespaceCredentials",
    )
    .expect("Failed to create CREDENTIALS_ENTRIES metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
/// Register every metric with the controller registry
///
/// Fails if called twice.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REMOTE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REMOTE_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CREDENTIALS_CONFLICTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CREDENTIALS_ENTRIES.clone()))?;
    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_remote_operations(kind: &str, operation: &str) {
    REMOTE_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_remote_operation_errors(kind: &str, operation: &str) {
    REMOTE_OPERATION_ERRORS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_requeues_total(trigger: &str) {
    REQUEUES_TOTAL.with_label_values(&[trigger]).inc();
}

pub fn increment_credentials_conflicts() {
    CREDENTIALS_CONFLICTS_TOTAL.inc();
}

pub fn set_credentials_entries(count: usize) {
    CREDENTIALS_ENTRIES.set(i64::try_from(count).unwrap_or(i64::MAX));
}
