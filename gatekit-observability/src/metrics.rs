use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Process-wide request/latency/pool metrics, exposed for Prometheus scrape
/// (spec.md §6's ambient observability surface).
pub struct MetricsCollector {
    registry: Registry,

    pub http_requests_total: IntCounterVec,
    pub http_request_duration: HistogramVec,
    pub active_connections: IntGauge,
    pub upstream_latency: HistogramVec,
    pub pool_in_use: IntGauge,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<MetricsCollector> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("gatekit_http_requests_total", "Total HTTP requests").namespace("gatekit"),
            &["route", "method", "status"],
        )?;
        let http_request_duration = HistogramVec::new(
            HistogramOpts::new("gatekit_http_request_duration_seconds", "Request latency")
                .namespace("gatekit")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["route"],
        )?;
        let active_connections = IntGauge::new("gatekit_active_connections", "Number of active connections")?;
        let upstream_latency = HistogramVec::new(
            HistogramOpts::new("gatekit_upstream_latency_seconds", "Upstream response time")
                .namespace("gatekit")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["upstream"],
        )?;
        let pool_in_use = IntGauge::new("gatekit_pool_connections_in_use", "Pooled upstream connections currently in use")?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(active_connections.clone()))?;
        registry.register(Box::new(upstream_latency.clone()))?;
        registry.register(Box::new(pool_in_use.clone()))?;

        Ok(MetricsCollector { registry, http_requests_total, http_request_duration, active_connections, upstream_latency, pool_in_use })
    }

    pub fn record_request(&self, route: &str, method: &str, status: u16, duration_secs: f64) {
        self.http_requests_total.with_label_values(&[route, method, &status.to_string()]).inc();
        self.http_request_duration.with_label_values(&[route]).observe(duration_secs);
    }

    pub fn record_upstream_latency(&self, upstream: &str, duration_secs: f64) {
        self.upstream_latency.with_label_values(&[upstream]).observe(duration_secs);
    }

    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let metrics = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metrics, &mut buffer).unwrap_or_default();
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for MetricsCollector {
    fn default() -> MetricsCollector {
        MetricsCollector::new().expect("metric descriptors are static and well-formed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_request_increments_counter_and_histogram() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_request("/api", "GET", 200, 0.01);
        let text = collector.gather_text();
        assert!(text.contains("gatekit_http_requests_total"));
        assert!(text.contains("gatekit_http_request_duration_seconds"));
    }

    #[test]
    fn gather_text_is_valid_prometheus_exposition() {
        let collector = MetricsCollector::new().unwrap();
        collector.active_connections.set(3);
        let text = collector.gather_text();
        assert!(text.contains("gatekit_active_connections 3"));
    }
}
