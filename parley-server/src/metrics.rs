//! Server metrics definitions
//!
//! OpenTelemetry instruments recorded when observability is enabled through
//! `ServerBuilder::with_observability()`.
//!
//! # Metrics Collected
//!
//! - **parley.server.connections.total**: connections accepted since startup (counter)
//! - **parley.server.connections.active**: currently open connections (up/down counter)
//! - **parley.server.requests.total**: requests by method and status (counter)
//! - **parley.server.request.duration**: handler latency in seconds (histogram)
//! - **parley.server.parse_errors.total**: envelopes rejected with `-32700` (counter)
//! - **parley.server.errors.total**: transport errors (counter)

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter, UpDownCounter},
    KeyValue,
};

pub struct ServerMetrics {
    pub connections_total: Counter<u64>,
    pub connections_active: UpDownCounter<i64>,
    pub requests_total: Counter<u64>,
    pub request_duration: Histogram<f64>,
    pub parse_errors_total: Counter<u64>,
    pub errors_total: Counter<u64>,
}

impl ServerMetrics {
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connections_total: meter
                .u64_counter("parley.server.connections.total")
                .with_description("Total number of connections accepted")
                .build(),
            connections_active: meter
                .i64_up_down_counter("parley.server.connections.active")
                .with_description("Number of open WebSocket connections")
                .build(),
            requests_total: meter
                .u64_counter("parley.server.requests.total")
                .with_description("Total number of requests processed")
                .build(),
            request_duration: meter
                .f64_histogram("parley.server.request.duration")
                .with_description("Request processing duration in seconds")
                .build(),
            parse_errors_total: meter
                .u64_counter("parley.server.parse_errors.total")
                .with_description("Total number of envelopes that failed to parse")
                .build(),
            errors_total: meter
                .u64_counter("parley.server.errors.total")
                .with_description("Total number of transport errors")
                .build(),
        }
    }

    pub fn record_connection_opened(&self) {
        self.connections_total.add(1, &[]);
        self.connections_active.add(1, &[]);
    }

    pub fn record_connection_closed(&self) {
        self.connections_active.add(-1, &[]);
    }

    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    pub fn record_parse_error(&self) {
        self.parse_errors_total.add(1, &[]);
    }

    pub fn record_error(&self, error_type: &str) {
        let attributes = &[KeyValue::new("error_type", error_type.to_string())];
        self.errors_total.add(1, attributes);
    }
}
