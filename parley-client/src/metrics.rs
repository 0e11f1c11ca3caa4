//! Client metrics definitions
//!
//! OpenTelemetry instruments recorded by [`ParleyClient`](crate::ParleyClient)
//! when observability is enabled through `ClientBuilder::with_observability()`.
//!
//! # Metrics Collected
//!
//! - **parley.client.connection.state**: current [`ConnectionState`](crate::ConnectionState) (gauge)
//! - **parley.client.calls.total**: calls by method and outcome (counter)
//! - **parley.client.call.duration**: call latency in seconds (histogram)
//! - **parley.client.errors.total**: transport and protocol errors (counter)
//! - **parley.client.reconnection.attempts**: reconnection attempts (counter)
//! - **parley.client.reconnection.success**: successful reconnections (counter)
//! - **parley.client.responses.unmatched**: responses with no pending call (counter)

use crate::ConnectionState;
use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter},
    KeyValue,
};
use parley_core::{Error, Result};

/// Client metrics for monitoring
pub struct ClientMetrics {
    pub connection_state: Gauge<i64>,
    pub calls_total: Counter<u64>,
    pub call_duration: Histogram<f64>,
    pub errors_total: Counter<u64>,
    pub reconnection_attempts: Counter<u64>,
    pub reconnection_success: Counter<u64>,
    pub responses_unmatched: Counter<u64>,
}

impl ClientMetrics {
    /// Create instruments on the global meter named after the service
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create instruments on a specific meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("parley.client.connection.state")
                .with_description("Connection state (0=disconnected, 1=connecting, 2=open, 3=reconnecting, 4=closing)")
                .build(),
            calls_total: meter
                .u64_counter("parley.client.calls.total")
                .with_description("Total number of calls by method and outcome")
                .build(),
            call_duration: meter
                .f64_histogram("parley.client.call.duration")
                .with_description("Call duration in seconds")
                .build(),
            errors_total: meter
                .u64_counter("parley.client.errors.total")
                .with_description("Total number of transport and protocol errors")
                .build(),
            reconnection_attempts: meter
                .u64_counter("parley.client.reconnection.attempts")
                .with_description("Total number of reconnection attempts")
                .build(),
            reconnection_success: meter
                .u64_counter("parley.client.reconnection.success")
                .with_description("Total number of successful reconnections")
                .build(),
            responses_unmatched: meter
                .u64_counter("parley.client.responses.unmatched")
                .with_description("Responses whose id matched no pending call")
                .build(),
        }
    }

    pub fn update_connection_state(&self, state: ConnectionState) {
        self.connection_state.record(state.as_metric(), &[]);
    }

    /// Record a finished call
    pub fn record_call<T>(&self, method: &str, outcome: &Result<T>, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("outcome", outcome_label(outcome)),
        ];
        self.calls_total.add(1, attributes);
        self.call_duration.record(duration_secs, attributes);
    }

    pub fn record_error(&self, error_type: &str) {
        let attributes = &[KeyValue::new("error_type", error_type.to_string())];
        self.errors_total.add(1, attributes);
    }

    pub fn record_reconnection_attempt(&self) {
        self.reconnection_attempts.add(1, &[]);
    }

    pub fn record_reconnection_success(&self) {
        self.reconnection_success.add(1, &[]);
    }

    pub fn record_unmatched_response(&self) {
        self.responses_unmatched.add(1, &[]);
    }
}

fn outcome_label<T>(outcome: &Result<T>) -> &'static str {
    match outcome {
        Ok(_) => "ok",
        Err(Error::Remote(_)) => "remote_error",
        Err(Error::RequestTimeout) => "timeout",
        Err(Error::Cancelled) => "cancelled",
        Err(Error::NotConnected) => "not_connected",
        Err(Error::Backpressure { .. }) => "backpressure",
        Err(_) => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::ErrorObject;

    #[test]
    fn test_metrics_creation() {
        let metrics = ClientMetrics::new("test-client");

        metrics.update_connection_state(ConnectionState::Open);
        metrics.record_call("chat", &Ok(()), 0.05);
        metrics.record_error("websocket");
        metrics.record_reconnection_attempt();
        metrics.record_reconnection_success();
        metrics.record_unmatched_response();
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome_label(&Ok::<(), Error>(())), "ok");
        assert_eq!(
            outcome_label::<()>(&Err(Error::Remote(ErrorObject::method_not_found()))),
            "remote_error"
        );
        assert_eq!(outcome_label::<()>(&Err(Error::RequestTimeout)), "timeout");
        assert_eq!(outcome_label::<()>(&Err(Error::Cancelled)), "cancelled");
        assert_eq!(outcome_label::<()>(&Err(Error::Io("x".into()))), "error");
    }
}
