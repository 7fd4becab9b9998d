//! Metric names and recorders for Lantern.
//!
//! Everything goes through the [`metrics`] facade. Lantern never installs
//! an exporter; until the host installs a recorder these calls are no-ops.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `lantern_requests_total` | Counter | `method`, `status` | Requests answered |
//! | `lantern_request_duration_seconds` | Histogram | `method` | Request latency |
//! | `lantern_active_connections` | Gauge | - | Open client connections |
//! | `lantern_server_starts_total` | Counter | - | Successful starts |
//! | `lantern_forced_drains_total` | Counter | - | Stops that hit the timeout |

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Request counter name.
pub const REQUESTS_TOTAL: &str = "lantern_requests_total";
/// Request latency histogram name.
pub const REQUEST_DURATION_SECONDS: &str = "lantern_request_duration_seconds";
/// Open connection gauge name.
pub const ACTIVE_CONNECTIONS: &str = "lantern_active_connections";
/// Successful start counter name.
pub const SERVER_STARTS_TOTAL: &str = "lantern_server_starts_total";
/// Forced drain counter name.
pub const FORCED_DRAINS_TOTAL: &str = "lantern_forced_drains_total";

/// Registers descriptions for all standard metrics with the installed
/// recorder. Call after installing one.
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of HTTP requests answered");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_gauge!(ACTIVE_CONNECTIONS, "Number of open client connections");
    describe_counter!(SERVER_STARTS_TOTAL, "Number of successful server starts");
    describe_counter!(
        FORCED_DRAINS_TOTAL,
        "Number of stops that force-closed connections after the timeout"
    );
}

/// Records an answered request.
pub fn record_request(method: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(duration.as_secs_f64());
}

/// Records a successful start.
pub fn record_server_start() {
    counter!(SERVER_STARTS_TOTAL).increment(1);
}

/// Records a stop that had to force-close connections.
pub fn record_forced_drain() {
    counter!(FORCED_DRAINS_TOTAL).increment(1);
}

/// Guard that keeps [`ACTIVE_CONNECTIONS`] in step with one connection.
///
/// Increments on creation and decrements on drop, so a connection task
/// that is dropped mid-flight is still accounted for.
#[derive(Debug)]
pub struct ConnectionGauge {
    _private: (),
}

impl ConnectionGauge {
    /// Creates a new guard and increments the gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(ACTIVE_CONNECTIONS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for ConnectionGauge {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionGauge {
    fn drop(&mut self) {
        gauge!(ACTIVE_CONNECTIONS).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_share_prefix() {
        for name in [
            REQUESTS_TOTAL,
            REQUEST_DURATION_SECONDS,
            ACTIVE_CONNECTIONS,
            SERVER_STARTS_TOTAL,
            FORCED_DRAINS_TOTAL,
        ] {
            assert!(name.starts_with("lantern_"), "{name}");
        }
    }

    #[test]
    fn test_record_functions_dont_panic() {
        // Without an installed recorder these are no-ops.
        describe_metrics();
        record_request("GET", 200, Duration::from_millis(10));
        record_server_start();
        record_forced_drain();
        let gauge = ConnectionGauge::new();
        drop(gauge);
    }
}
