//! Prometheus metrics for Sharcache

use prometheus::{IntCounter, IntGauge, Registry};

/// Global metrics instance
pub struct Metrics {
    pub registry: Registry,

    // Command counters
    pub cmd_get: IntCounter,
    pub cmd_put: IntCounter,
    pub cmd_lst: IntCounter,
    pub cmd_cln: IntCounter,
    pub cmd_rst: IntCounter,

    // Hit/miss counters
    pub get_hits: IntCounter,
    pub get_misses: IntCounter,

    // Eviction counters
    pub evicted_entries: IntCounter,
    pub evicted_bytes: IntCounter,

    // Connection metrics
    pub active_connections: IntGauge,
    pub total_connections: IntCounter,
    pub rejected_connections: IntCounter,

    // Bytes counters
    pub bytes_read: IntCounter,
    pub bytes_written: IntCounter,

    // Error counters
    pub protocol_errors: IntCounter,
    pub store_errors: IntCounter,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        let registry = Registry::new();

        let cmd_get = IntCounter::new("sharcache_cmd_get_total", "Total GET commands").unwrap();
        let cmd_put = IntCounter::new("sharcache_cmd_put_total", "Total PUT commands").unwrap();
        let cmd_lst = IntCounter::new("sharcache_cmd_lst_total", "Total LST commands").unwrap();
        let cmd_cln = IntCounter::new("sharcache_cmd_cln_total", "Total CLN commands").unwrap();
        let cmd_rst = IntCounter::new("sharcache_cmd_rst_total", "Total RST commands").unwrap();

        let get_hits = IntCounter::new("sharcache_get_hits_total", "Total GET hits").unwrap();
        let get_misses =
            IntCounter::new("sharcache_get_misses_total", "Total GET misses").unwrap();

        let evicted_entries = IntCounter::new(
            "sharcache_evicted_entries_total",
            "Entries removed by eviction passes",
        )
        .unwrap();
        let evicted_bytes = IntCounter::new(
            "sharcache_evicted_bytes_total",
            "Bytes reclaimed by eviction passes",
        )
        .unwrap();

        let active_connections = IntGauge::new(
            "sharcache_active_connections",
            "Current active connections",
        )
        .unwrap();
        let total_connections =
            IntCounter::new("sharcache_connections_total", "Total connections accepted").unwrap();
        let rejected_connections = IntCounter::new(
            "sharcache_rejected_connections_total",
            "Total connections rejected",
        )
        .unwrap();

        let bytes_read =
            IntCounter::new("sharcache_bytes_read_total", "Total bytes read").unwrap();
        let bytes_written =
            IntCounter::new("sharcache_bytes_written_total", "Total bytes written").unwrap();

        let protocol_errors =
            IntCounter::new("sharcache_protocol_errors_total", "Total protocol errors").unwrap();
        let store_errors =
            IntCounter::new("sharcache_store_errors_total", "Total store errors").unwrap();

        // Register all metrics
        registry.register(Box::new(cmd_get.clone())).unwrap();
        registry.register(Box::new(cmd_put.clone())).unwrap();
        registry.register(Box::new(cmd_lst.clone())).unwrap();
        registry.register(Box::new(cmd_cln.clone())).unwrap();
        registry.register(Box::new(cmd_rst.clone())).unwrap();
        registry.register(Box::new(get_hits.clone())).unwrap();
        registry.register(Box::new(get_misses.clone())).unwrap();
        registry
            .register(Box::new(evicted_entries.clone()))
            .unwrap();
        registry.register(Box::new(evicted_bytes.clone())).unwrap();
        registry
            .register(Box::new(active_connections.clone()))
            .unwrap();
        registry
            .register(Box::new(total_connections.clone()))
            .unwrap();
        registry
            .register(Box::new(rejected_connections.clone()))
            .unwrap();
        registry.register(Box::new(bytes_read.clone())).unwrap();
        registry.register(Box::new(bytes_written.clone())).unwrap();
        registry
            .register(Box::new(protocol_errors.clone()))
            .unwrap();
        registry.register(Box::new(store_errors.clone())).unwrap();

        Self {
            registry,
            cmd_get,
            cmd_put,
            cmd_lst,
            cmd_cln,
            cmd_rst,
            get_hits,
            get_misses,
            evicted_entries,
            evicted_bytes,
            active_connections,
            total_connections,
            rejected_connections,
            bytes_read,
            bytes_written,
            protocol_errors,
            store_errors,
        }
    }

    /// Get Prometheus formatted metrics
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
