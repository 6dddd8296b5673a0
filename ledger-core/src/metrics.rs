//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger store.
//!
//! # Metrics
//!
//! - `ledger_transactions_committed_total` - Transactions that committed
//! - `ledger_transaction_conflicts_total` - Attempts rejected by compare-and-swap
//! - `ledger_transactions_exhausted_total` - Transactions that ran out of retries
//! - `ledger_commit_duration_seconds` - Histogram of attempt-to-commit latency

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Committed transactions
    pub committed: IntCounter,

    /// Conflicting attempts
    pub conflicts: IntCounter,

    /// Transactions abandoned after the retry budget
    pub exhausted: IntCounter,

    /// Commit duration histogram
    pub commit_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("committed", &self.committed.get())
            .field("conflicts", &self.conflicts.get())
            .field("exhausted", &self.exhausted.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector on a private registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let committed = IntCounter::new(
            "ledger_transactions_committed_total",
            "Transactions that committed",
        )?;
        registry.register(Box::new(committed.clone()))?;

        let conflicts = IntCounter::new(
            "ledger_transaction_conflicts_total",
            "Attempts rejected by compare-and-swap",
        )?;
        registry.register(Box::new(conflicts.clone()))?;

        let exhausted = IntCounter::new(
            "ledger_transactions_exhausted_total",
            "Transactions that ran out of retries",
        )?;
        registry.register(Box::new(exhausted.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_commit_duration_seconds",
                "Histogram of attempt-to-commit latency",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        Ok(Self {
            committed,
            conflicts,
            exhausted,
            commit_duration,
            registry,
        })
    }

    /// Record a committed transaction
    pub fn record_commit(&self, duration_seconds: f64) {
        self.committed.inc();
        self.commit_duration.observe(duration_seconds);
    }

    /// Record a conflicting attempt
    pub fn record_conflict(&self) {
        self.conflicts.inc();
    }

    /// Record an abandoned transaction
    pub fn record_exhausted(&self) {
        self.exhausted.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
