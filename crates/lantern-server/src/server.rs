//! The restartable server.
//!
//! [`Server`] owns the route table and at most one running instance.
//! Routes can be registered at any time; `start`, `stop` and restart are
//! serialized by an internal async mutex so lifecycle callbacks from the
//! host can arrive in any order without extra synchronization. The mutex
//! is released before the liveness dials, and the request path never
//! takes it.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use lantern_server::{Context, Method, Request, ResponseWriter, Server, Settings};
//!
//! # async fn run() -> Result<(), lantern_server::ServerError> {
//! let server = Server::new();
//! async fn greet(ctx: Context, mut res: ResponseWriter, _req: Request) {
//!     let greeting = ctx.str_value("greeting").unwrap_or("Hello");
//!     let name = ctx.str_value("name").unwrap_or("Stranger");
//!     res.write_str(&format!("{greeting}, {name}"));
//! }
//!
//! server.handle(Method::Get, "/:name", greet)?;
//!
//! let root_url = server
//!     .start("127.0.0.1:0", Settings::new().with("greeting", "Namaste"))
//!     .await?;
//! println!("serving on {root_url}");
//!
//! server.stop(Duration::from_millis(100)).await;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lantern_core::{Context, Generation, Settings};
use lantern_router::Method;
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{Handler, Request, ResponseWriter, SharedHandler};
use crate::lifecycle::{DrainOutcome, Instance, ServerState};
use crate::routes::RouteTable;
use crate::verify::{reachable_addr, verify_listening};

/// Externally observable snapshot of the lifecycle.
#[derive(Debug, Clone)]
struct Status {
    state: ServerState,
    root_url: Option<String>,
    local_addr: Option<SocketAddr>,
    generation: Option<u64>,
}

impl Status {
    const IDLE: Self = Self {
        state: ServerState::Idle,
        root_url: None,
        local_addr: None,
        generation: None,
    };
}

/// Post-bind liveness check; [`verify_listening`] outside tests.
pub(crate) type Verifier =
    fn(SocketAddr) -> Pin<Box<dyn Future<Output = ServerResult<u32>> + Send>>;

fn dial_listener(addr: SocketAddr) -> Pin<Box<dyn Future<Output = ServerResult<u32>> + Send>> {
    Box::pin(verify_listening(addr))
}

/// An embeddable HTTP server that can be started, stopped and restarted
/// any number of times.
pub struct Server {
    config: ServerConfig,
    routes: Arc<RouteTable>,
    instance: Mutex<Option<Instance>>,
    status: RwLock<Status>,
    generations: AtomicU64,
    verifier: Verifier,
}

impl Server {
    /// Creates an idle server with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Creates an idle server with the given configuration.
    #[must_use]
    pub fn with_config(config: ServerConfig) -> Self {
        Self::with_verifier(config, dial_listener)
    }

    pub(crate) fn with_verifier(config: ServerConfig, verifier: Verifier) -> Self {
        Self {
            config,
            routes: Arc::new(RouteTable::new()),
            instance: Mutex::new(None),
            status: RwLock::new(Status::IDLE),
            generations: AtomicU64::new(0),
            verifier,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the shared route table.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Registers a handler for `method` and `pattern`.
    ///
    /// Safe to call while the server is running; the route becomes
    /// visible to new requests atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Route`] if the pattern is malformed or
    /// conflicts with an existing route.
    pub fn handle(&self, method: Method, pattern: &str, handler: impl Handler) -> ServerResult<()> {
        self.handle_shared(method, pattern, Arc::new(handler))
    }

    /// Registers an async function or closure.
    ///
    /// Same as [`handle`](Self::handle), but the `Fn` bound lets closure
    /// argument types be inferred.
    pub fn handle_fn<F, Fut>(&self, method: Method, pattern: &str, f: F) -> ServerResult<()>
    where
        F: Fn(Context, ResponseWriter, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.handle(method, pattern, f)
    }

    /// Registers an already shared handler.
    pub fn handle_shared(
        &self,
        method: Method,
        pattern: &str,
        handler: SharedHandler,
    ) -> ServerResult<()> {
        self.routes.insert(method, pattern, handler)?;
        Ok(())
    }

    /// Binds `addr`, starts serving under a fresh settings generation and
    /// returns the root URL (`http://host:port`, no trailing slash).
    ///
    /// If an instance is already running it is stopped first, using the
    /// configured restart timeout; two listeners are never alive at once.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Context`] if `settings` uses a reserved key
    /// - [`ServerError::Bind`] if the address cannot be bound
    /// - [`ServerError::StartupVerification`] if the listener never
    ///   accepted a dial; the instance has been torn down
    ///
    /// Settings are validated before a running instance is touched, so a
    /// rejected restart leaves the previous instance serving. On any other
    /// error, nothing this call created is left running. The state reads
    /// Running only once verification has passed.
    pub async fn start(&self, addr: &str, settings: Settings) -> ServerResult<String> {
        let mut slot = self.instance.lock().await;

        let id = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Generation::new(id, settings)?;

        if let Some(previous) = slot.take() {
            tracing::info!(addr, "restarting server");
            self.stop_instance(previous, self.config.restart_timeout()).await;
        }

        let bind_error = |source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        };
        let listener = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let dial_addr = reachable_addr(local_addr);
        let root_url = format!("http://{dial_addr}");
        let generation = Arc::new(generation.with_runtime_value("root_url", root_url.clone()));

        *slot = Some(Instance::spawn(
            listener,
            local_addr,
            root_url.clone(),
            generation,
            Arc::clone(&self.routes),
            self.config.keep_alive(),
        ));
        drop(slot);

        // Verification runs unlocked; a concurrent stop or restart may
        // replace this instance meanwhile, so both outcomes below only
        // touch the generation started here.
        let verified = (self.verifier)(dial_addr).await;

        let mut slot = self.instance.lock().await;
        let ours = slot.as_ref().is_some_and(|i| i.generation().id() == id);

        if let Err(e) = verified {
            tracing::error!(%local_addr, error = %e, "startup verification failed");
            if ours {
                if let Some(instance) = slot.take() {
                    self.stop_instance(instance, Duration::ZERO).await;
                }
            }
            return Err(e);
        }

        if let Some(instance) = slot.as_ref().filter(|_| ours) {
            self.publish(instance);
        }
        drop(slot);

        lantern_telemetry::metrics::record_server_start();
        tracing::info!(%root_url, generation = id, "server started");

        Ok(root_url)
    }

    /// Starts on the configured bind address.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub async fn start_configured(&self, settings: Settings) -> ServerResult<String> {
        let addr = self.config.bind_addr().to_string();
        self.start(&addr, settings).await
    }

    /// Stops the running instance, if any.
    ///
    /// Cancels the generation, closes the listener, then waits up to
    /// `timeout` for open connections before force-closing them. Never
    /// fails; on an idle server this is a no-op.
    pub async fn stop(&self, timeout: Duration) {
        let mut slot = self.instance.lock().await;
        match slot.take() {
            Some(instance) => self.stop_instance(instance, timeout).await,
            None => tracing::debug!("stop called on idle server"),
        }
    }

    /// Stops with the configured shutdown timeout.
    pub async fn shutdown(&self) {
        self.stop(self.config.shutdown_timeout()).await;
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.status.read().state
    }

    /// Returns true while an instance is Running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// Returns the root URL of the running instance.
    #[must_use]
    pub fn root_url(&self) -> Option<String> {
        self.status.read().root_url.clone()
    }

    /// Returns the bound address of the running instance.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.status.read().local_addr
    }

    /// Returns the id of the live generation.
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        self.status.read().generation
    }

    fn publish(&self, instance: &Instance) {
        *self.status.write() = Status {
            state: ServerState::Running,
            root_url: Some(instance.root_url().to_string()),
            local_addr: Some(instance.local_addr()),
            generation: Some(instance.generation().id()),
        };
    }

    async fn stop_instance(&self, instance: Instance, timeout: Duration) {
        let generation = instance.generation().id();
        self.status.write().state = ServerState::Stopping;
        tracing::info!(generation, ?timeout, "stopping server");

        match instance.drain(timeout).await {
            DrainOutcome::Graceful => tracing::info!(generation, "server stopped"),
            DrainOutcome::Forced { remaining } => {
                tracing::info!(generation, remaining, "server stopped after forced drain");
            }
        }

        *self.status.write() = Status::IDLE;
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status.read();
        f.debug_struct("Server")
            .field("state", &status.state)
            .field("root_url", &status.root_url)
            .field("generation", &status.generation)
            .field("routes", &self.routes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_core::ContextError;

    #[test]
    fn test_new_server_is_idle() {
        let server = Server::new();
        assert_eq!(server.state(), ServerState::Idle);
        assert!(!server.is_running());
        assert_eq!(server.root_url(), None);
        assert_eq!(server.local_addr(), None);
        assert_eq!(server.generation(), None);
    }

    #[test]
    fn test_register_before_start() {
        let server = Server::new();
        server
            .handle_fn(Method::Get, "/:name", |_ctx, _res, _req| async {})
            .unwrap();
        let err = server
            .handle_fn(Method::Get, "/:other", |_ctx, _res, _req| async {})
            .unwrap_err();

        assert!(matches!(err, ServerError::Route(_)));
        assert_eq!(server.routes().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_on_idle_is_noop() {
        let server = Server::new();
        server.stop(Duration::from_millis(10)).await;
        server.shutdown().await;
        assert_eq!(server.state(), ServerState::Idle);
    }

    #[tokio::test]
    async fn test_reserved_settings_fail_before_bind() {
        let server = Server::new();
        let err = server
            .start("127.0.0.1:0", Settings::new().with("lantern.root_url", "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServerError::Context(ContextError::ReservedKey { .. })));
        assert_eq!(server.state(), ServerState::Idle);
    }

    fn refuse_dials(
        addr: SocketAddr,
    ) -> Pin<Box<dyn Future<Output = ServerResult<u32>> + Send>> {
        Box::pin(async move {
            Err(ServerError::StartupVerification { addr, attempts: 5 })
        })
    }

    #[tokio::test]
    async fn test_failed_verification_tears_down() {
        let server = Server::with_verifier(ServerConfig::default(), refuse_dials);
        server
            .handle_fn(Method::Get, "/", |_ctx, _res, _req| async {})
            .unwrap();

        let err = server.start("127.0.0.1:0", Settings::new()).await.unwrap_err();
        let addr = match err {
            ServerError::StartupVerification { addr, .. } => addr,
            other => panic!("expected StartupVerification, got {other}"),
        };

        assert_eq!(server.state(), ServerState::Idle);
        assert_eq!(server.generation(), None);
        assert_eq!(server.root_url(), None);
        assert!(server.instance.lock().await.is_none());
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_rejected_restart_keeps_previous_instance() {
        let server = Server::new();
        let url = server
            .start("127.0.0.1:0", Settings::new().with("greeting", "Namaste"))
            .await
            .unwrap();

        let err = server
            .start("127.0.0.1:0", Settings::new().with("lantern.x", 1_u8))
            .await
            .unwrap_err();

        assert!(matches!(err, ServerError::Context(_)));
        assert_eq!(server.state(), ServerState::Running);
        assert_eq!(server.generation(), Some(1));
        assert_eq!(server.root_url().as_deref(), Some(url.as_str()));
        assert!(tokio::net::TcpStream::connect(server.local_addr().unwrap())
            .await
            .is_ok());

        server.stop(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_start_reports_loopback_url() {
        let server = Server::new();
        let url = server.start("127.0.0.1:0", Settings::new()).await.unwrap();

        let addr = server.local_addr().unwrap();
        assert_eq!(url, format!("http://127.0.0.1:{}", addr.port()));
        assert!(!url.ends_with('/'));
        assert_eq!(server.state(), ServerState::Running);
        assert_eq!(server.root_url().as_deref(), Some(url.as_str()));
        assert_eq!(server.generation(), Some(1));

        server.stop(Duration::from_millis(100)).await;
        assert_eq!(server.state(), ServerState::Idle);
        assert_eq!(server.generation(), None);
    }

    #[tokio::test]
    async fn test_unspecified_bind_reports_loopback() {
        let server = Server::new();
        let url = server.start("0.0.0.0:0", Settings::new()).await.unwrap();

        assert!(url.starts_with("http://127.0.0.1:"), "{url}");
        assert!(server.local_addr().unwrap().ip().is_unspecified());

        server.stop(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_restart_bumps_generation() {
        let server = Server::new();
        server.start("127.0.0.1:0", Settings::new()).await.unwrap();
        server.start("127.0.0.1:0", Settings::new()).await.unwrap();

        assert_eq!(server.generation(), Some(2));
        assert!(server.is_running());

        server.stop(Duration::from_millis(100)).await;
    }
}
