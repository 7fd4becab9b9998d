//! Observability plumbing for Lantern.
//!
//! - **Logging**: [`init_logging`] installs a `tracing-subscriber` fmt layer
//!   (JSON or pretty) behind an `EnvFilter`
//! - **Metrics**: counters, gauges and histograms recorded through the
//!   [`metrics`](::metrics) facade; the host chooses the exporter
//!
//! Both are optional. The server emits `tracing` events and `metrics`
//! samples either way; they are simply discarded until something listens.

#![doc(html_root_url = "https://docs.rs/lantern-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
