//! Structured logging for Lantern.
//!
//! Lantern itself only emits `tracing` events and spans. Hosts that do not
//! bring their own subscriber can call [`init_logging`] once at startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use lantern_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//!
//! tracing::info!(root_url = "http://127.0.0.1:8080", "server started");
//! ```

use serde::Deserialize;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Subscriber settings for [`init_logging`].
///
/// Sits under `[logging]` in the server's TOML file:
///
/// ```toml
/// [logging]
/// level = "lantern=debug,info"
/// json_format = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `false` turns [`init_logging`] into a no-op.
    pub enabled: bool,

    /// `EnvFilter` directive, e.g. `lantern_server=debug,warn`.
    pub level: String,

    /// One JSON object per line instead of the multi-line pretty format.
    pub json_format: bool,

    /// Emit an event when each request span opens and closes.
    pub span_events: bool,

    /// Record source file and line.
    pub file_line_info: bool,

    /// Record the emitting thread's id.
    pub thread_ids: bool,

    /// Record the module path of each event.
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Pretty output at debug level, with request spans.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            ..Self::default()
        }
    }

    /// JSON at info level; the same as [`Default`].
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer(config: &LogConfig) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(config.span_events())
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_thread_ids(config.thread_ids)
        .with_target(config.include_target);

    if config.json_format {
        layer.json().boxed()
    } else {
        layer.pretty().boxed()
    }
}

/// Installs the global `tracing` subscriber described by `config`.
///
/// Call at most once per process; hosts that already own a subscriber
/// should skip this and let Lantern's events flow into theirs.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a malformed filter and
/// [`TelemetryError::LoggingInit`] if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    tracing_subscriber::registry()
        .with(fmt_layer(config).with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Parses a filter directive.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the directive is malformed.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}
