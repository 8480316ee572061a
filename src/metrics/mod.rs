// Private module declaration
mod server;

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the order lifecycle
// ============================================================================
//
// Provides metrics for:
// - Placements and cancellations
// - Applied and skipped status transitions
// - Store and cart collaborator failures
// - Pending timer handles in the scheduled transition table
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the lifecycle service
pub struct Metrics {
    registry: Registry,

    // Lifecycle
    pub orders_placed: IntCounter,
    pub orders_cancelled: IntCounterVec,
    pub transitions_applied: IntCounterVec,
    pub transitions_skipped: IntCounterVec,

    // Collaborators
    pub store_failures: IntCounterVec,
    pub cart_clear_failures: IntCounter,

    // Scheduling
    pub pending_timers: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_placed = IntCounter::new("orders_placed_total", "Total orders placed")?;
        registry.register(Box::new(orders_placed.clone()))?;

        let orders_cancelled = IntCounterVec::new(
            Opts::new("orders_cancelled_total", "Total orders cancelled"),
            &["from_status"],
        )?;
        registry.register(Box::new(orders_cancelled.clone()))?;

        let transitions_applied = IntCounterVec::new(
            Opts::new("order_transitions_total", "Scheduled status transitions applied"),
            &["to_status"],
        )?;
        registry.register(Box::new(transitions_applied.clone()))?;

        let transitions_skipped = IntCounterVec::new(
            Opts::new(
                "order_transitions_skipped_total",
                "Scheduled status transitions that were no-ops",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(transitions_skipped.clone()))?;

        let store_failures = IntCounterVec::new(
            Opts::new("order_store_failures_total", "Order store calls that failed"),
            &["operation"],
        )?;
        registry.register(Box::new(store_failures.clone()))?;

        let cart_clear_failures = IntCounter::new(
            "cart_clear_failures_total",
            "Cart clears that failed after a successful placement",
        )?;
        registry.register(Box::new(cart_clear_failures.clone()))?;

        let pending_timers = IntGauge::new(
            "order_pending_timers",
            "Timer handles currently registered in the scheduled transition table",
        )?;
        registry.register(Box::new(pending_timers.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            orders_cancelled,
            transitions_applied,
            transitions_skipped,
            store_failures,
            cart_clear_failures,
            pending_timers,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_placed(&self) {
        self.orders_placed.inc();
    }

    pub fn record_cancelled(&self, from_status: &str) {
        self.orders_cancelled.with_label_values(&[from_status]).inc();
    }

    pub fn record_transition(&self, to_status: &str) {
        self.transitions_applied.with_label_values(&[to_status]).inc();
    }

    pub fn record_skipped(&self, reason: &str) {
        self.transitions_skipped.with_label_values(&[reason]).inc();
    }

    pub fn record_store_failure(&self, operation: &str) {
        self.store_failures.with_label_values(&[operation]).inc();
    }

    pub fn record_cart_clear_failure(&self) {
        self.cart_clear_failures.inc();
    }
}
