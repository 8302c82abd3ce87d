//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connection gauge
//! - Chat message outcomes (persisted, dropped, rejected)
//! - Connection evictions by reason
//! - Broadcast fan-out latency histogram
//! - Database query duration histograms

use std::time::Instant;

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

const NAMESPACE: &str = "forum_chat";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Live WebSocket connections currently in the registry
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "websocket_connections_active",
            "Number of registered chat connections",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Inbound chat messages by outcome
pub static CHAT_MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("messages_total", "Inbound chat messages by outcome").namespace(NAMESPACE),
        &["outcome"], // "persisted", "dropped", "rejected"
    )
    .expect("Failed to create CHAT_MESSAGES_TOTAL metric")
});

/// Connections removed from the registry, by reason
pub static CHAT_EVICTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("evictions_total", "Chat connections removed, by reason").namespace(NAMESPACE),
        &["reason"], // "delivery_failure", "slow_consumer", "read_deadline", ...
    )
    .expect("Failed to create CHAT_EVICTIONS_TOTAL metric")
});

/// Time spent fanning one message out to every registered connection
pub static BROADCAST_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    let buckets = vec![0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1];
    Histogram::with_opts(
        HistogramOpts::new(
            "broadcast_duration_seconds",
            "Fan-out latency per broadcast message in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
    )
    .expect("Failed to create BROADCAST_DURATION_SECONDS metric")
});

/// Database query duration histogram
pub static DB_QUERY_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];
    HistogramVec::new(
        HistogramOpts::new(
            "db_query_duration_seconds",
            "Database query latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["operation", "table"],
    )
    .expect("Failed to create DB_QUERY_DURATION_SECONDS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(CHAT_MESSAGES_TOTAL.clone()))
        .expect("Failed to register CHAT_MESSAGES_TOTAL");
    registry
        .register(Box::new(CHAT_EVICTIONS_TOTAL.clone()))
        .expect("Failed to register CHAT_EVICTIONS_TOTAL");
    registry
        .register(Box::new(BROADCAST_DURATION_SECONDS.clone()))
        .expect("Failed to register BROADCAST_DURATION_SECONDS");
    registry
        .register(Box::new(DB_QUERY_DURATION_SECONDS.clone()))
        .expect("Failed to register DB_QUERY_DURATION_SECONDS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record the outcome of one inbound chat message
pub fn record_message(outcome: &str) {
    CHAT_MESSAGES_TOTAL.with_label_values(&[outcome]).inc();
}

/// Helper to record a connection leaving the registry
pub fn record_eviction(reason: &str) {
    CHAT_EVICTIONS_TOTAL.with_label_values(&[reason]).inc();
}

/// Helper to update the live connection gauge
pub fn set_websocket_connections(connected: usize) {
    WEBSOCKET_CONNECTIONS_ACTIVE.set(connected as i64);
}

/// Helper to record broadcast fan-out latency
pub fn record_broadcast(duration_secs: f64) {
    BROADCAST_DURATION_SECONDS.observe(duration_secs);
}

/// Helper to record database query metrics
pub fn record_db_query(operation: &str, table: &str, duration_secs: f64) {
    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation, table])
        .observe(duration_secs);
}

/// Measures one database query. Dropped timers (failed queries) record nothing.
pub struct DbTimer {
    operation: &'static str,
    table: &'static str,
    started: Instant,
}

impl DbTimer {
    pub fn start(operation: &'static str, table: &'static str) -> Self {
        Self {
            operation,
            table,
            started: Instant::now(),
        }
    }

    pub fn finish(self) {
        record_db_query(
            self.operation,
            self.table,
            self.started.elapsed().as_secs_f64(),
        );
    }
}
