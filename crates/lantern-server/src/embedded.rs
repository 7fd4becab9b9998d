//! Blocking facade for hosts without an async runtime.
//!
//! Mobile lifecycle callbacks (foreground/background) arrive on plain
//! threads. [`EmbeddedServer`] owns a dedicated multi-threaded runtime and
//! exposes `start`/`stop` as ordinary blocking calls.
//!
//! These methods must not be called from inside another Tokio runtime.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use lantern_server::embedded::{EmbeddedServer, RuntimeConfig};
//! use lantern_server::{Method, Settings};
//!
//! # fn main() -> Result<(), lantern_server::ServerError> {
//! let server = EmbeddedServer::new(&RuntimeConfig::default())?;
//! server.handle_fn(Method::Get, "/ping", |_ctx, mut res, _req| async move {
//!     res.write_str("pong");
//! })?;
//!
//! let url = server.start("127.0.0.1:0", Settings::new())?;
//! // ... hand `url` to the WebView ...
//! server.stop(Duration::from_millis(150));
//! # let _ = url;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::ops::Deref;
use std::time::Duration;

use lantern_core::{Context, Settings};
use lantern_router::Method;
use tokio::runtime::Runtime;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{Request, ResponseWriter};
use crate::server::Server;

/// Runtime options for [`EmbeddedServer`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of worker threads (0 = one per core).
    pub worker_threads: usize,
    /// Stack size for worker threads in bytes.
    pub thread_stack_size: usize,
    /// Thread name prefix.
    pub thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            thread_stack_size: 2 * 1024 * 1024,
            thread_name: "lantern-worker".to_string(),
        }
    }
}

/// Builds a multi-threaded runtime from `config`.
pub fn build_runtime(config: &RuntimeConfig) -> std::io::Result<Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder
        .enable_all()
        .thread_name(&config.thread_name)
        .thread_stack_size(config.thread_stack_size);

    if config.worker_threads > 0 {
        builder.worker_threads(config.worker_threads);
    }

    builder.build()
}

/// A [`Server`] bundled with the runtime that drives it.
///
/// Dereferences to [`Server`] for registration and the state observers.
pub struct EmbeddedServer {
    server: Server,
    runtime: Runtime,
}

impl EmbeddedServer {
    /// Creates an idle server with the default [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Runtime`] if the runtime cannot be built.
    pub fn new(runtime: &RuntimeConfig) -> ServerResult<Self> {
        Self::with_config(ServerConfig::default(), runtime)
    }

    /// Creates an idle server with the given configuration.
    pub fn with_config(config: ServerConfig, runtime: &RuntimeConfig) -> ServerResult<Self> {
        let runtime = build_runtime(runtime).map_err(ServerError::Runtime)?;
        Ok(Self {
            server: Server::with_config(config),
            runtime,
        })
    }

    /// Registers an async function or closure. See [`Server::handle_fn`].
    pub fn handle_fn<F, Fut>(&self, method: Method, pattern: &str, f: F) -> ServerResult<()>
    where
        F: Fn(Context, ResponseWriter, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.server.handle_fn(method, pattern, f)
    }

    /// Blocking [`Server::start`].
    pub fn start(&self, addr: &str, settings: Settings) -> ServerResult<String> {
        self.runtime.block_on(self.server.start(addr, settings))
    }

    /// Blocking [`Server::stop`].
    ///
    /// Returns within `timeout` plus listener-close overhead.
    pub fn stop(&self, timeout: Duration) {
        self.runtime.block_on(self.server.stop(timeout));
    }

    /// Returns the runtime, e.g. to spawn host-side background work.
    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}

impl Deref for EmbeddedServer {
    type Target = Server;

    fn deref(&self) -> &Server {
        &self.server
    }
}

impl Drop for EmbeddedServer {
    fn drop(&mut self) {
        if self.server.is_running() {
            let timeout = self.server.config().shutdown_timeout();
            self.runtime.block_on(self.server.stop(timeout));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ServerState;

    #[test]
    fn test_default_runtime_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.thread_name, "lantern-worker");
    }

    #[test]
    fn test_build_runtime() {
        let config = RuntimeConfig {
            worker_threads: 1,
            thread_stack_size: 1024 * 1024,
            thread_name: "test-runtime".to_string(),
        };
        let rt = build_runtime(&config).unwrap();
        assert_eq!(rt.block_on(async { 42 }), 42);
    }

    #[test]
    fn test_blocking_start_stop_cycle() {
        let server = EmbeddedServer::new(&RuntimeConfig::default()).unwrap();
        server
            .handle_fn(Method::Get, "/ping", |_ctx, mut res, _req| async move {
                res.write_str("pong");
            })
            .unwrap();

        for _ in 0..3 {
            let url = server.start("127.0.0.1:0", Settings::new()).unwrap();
            assert!(url.starts_with("http://127.0.0.1:"));
            assert_eq!(server.state(), ServerState::Running);

            server.stop(Duration::from_millis(100));
            assert_eq!(server.state(), ServerState::Idle);
        }
    }

    #[test]
    fn test_drop_stops_running_server() {
        let server = EmbeddedServer::new(&RuntimeConfig::default()).unwrap();
        server.start("127.0.0.1:0", Settings::new()).unwrap();
        let addr = server.local_addr().unwrap();
        drop(server);

        assert!(std::net::TcpStream::connect(addr).is_err());
    }
}
