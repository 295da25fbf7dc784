//! The two metrics the correlation engine emits per completed request.

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use std::sync::Once;

/// Fixed histogram buckets (seconds) for `request_duration_seconds`.
pub const DURATION_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static DESCRIBE_ONCE: Once = Once::new();

pub(crate) fn describe_metrics() {
    DESCRIBE_ONCE.call_once(|| {
        describe_counter!(
            "requests_total",
            Unit::Count,
            "Total number of attributed HTTP requests observed."
        );
        describe_histogram!(
            "request_duration_seconds",
            Unit::Seconds,
            "Request-to-response latency for attributed HTTP requests."
        );
    });
}

/// Workload identity labels attached to every recorded request.
#[derive(Debug, Clone, Copy)]
pub struct RequestLabels<'a> {
    /// Source workload name, or the raw IP if unresolved.
    pub source: &'a str,
    /// Source workload namespace, empty if unresolved.
    pub source_ns: &'a str,
    /// Destination workload name, or the raw IP if unresolved.
    pub destination: &'a str,
    /// Destination workload namespace, empty if unresolved.
    pub destination_ns: &'a str,
    /// HTTP method of the request.
    pub method: &'a str,
    /// Request URL as observed in the preamble.
    pub url: &'a str,
}

/// Increment `requests_total` and observe `request_duration_seconds` for one
/// completed request/response pairing.
pub fn record_request(labels: &RequestLabels<'_>, duration_seconds: f64) {
    describe_metrics();

    let label_set = [
        ("source", labels.source.to_string()),
        ("source_ns", labels.source_ns.to_string()),
        ("destination", labels.destination.to_string()),
        ("destination_ns", labels.destination_ns.to_string()),
        ("method", labels.method.to_string()),
        ("url", labels.url.to_string()),
    ];

    counter!("requests_total", &label_set).increment(1);
    histogram!("request_duration_seconds", &label_set).record(duration_seconds);
}
