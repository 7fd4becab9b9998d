//! One running server instance: listener, accept loop, connections.
//!
//! An [`Instance`] exists exactly while the server is Running or
//! Stopping. It owns the generation it was started with; every
//! connection it accepts captures that generation's root context, so a
//! request always completes under the generation it arrived in.
//!
//! # Drain order
//!
//! 1. Cancel the generation. Handlers observing `ctx.cancelled()` wake,
//!    the accept loop exits and drops the listener, and every connection
//!    switches to a graceful HTTP/1 shutdown.
//! 2. Await the accept loop, so the listening socket is closed.
//! 3. Wait up to the caller's timeout for the connection tracker to go
//!    idle.
//! 4. On timeout, fire the force signal: connection futures (and the
//!    handler futures inside them) are dropped and their sockets closed.
//!    A short bounded grace lets those tasks observe it.

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use lantern_core::{CancelSignal, Context, Generation};
use lantern_telemetry::metrics::{record_forced_drain, ConnectionGauge};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::handler::HttpResponse;
use crate::routes::RouteTable;
use crate::shutdown::{ConnectionToken, ConnectionTracker};

/// Grace allowed after force-closing connections for their tasks to
/// unwind.
pub const FORCE_CLOSE_GRACE: Duration = Duration::from_millis(25);

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Lifecycle state of a [`Server`](crate::Server).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerState {
    /// No listener and no generation.
    Idle,
    /// Listener bound, one generation live, requests being served.
    Running,
    /// Generation cancelled, connections draining.
    Stopping,
}

impl ServerState {
    /// Returns the lower-case name of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainOutcome {
    /// Every connection closed within the timeout.
    Graceful,
    /// Connections were still open at the timeout and were force-closed.
    Forced {
        /// Connections open when the timeout fired.
        remaining: usize,
    },
}

/// A live listener plus everything needed to tear it down.
pub(crate) struct Instance {
    generation: Arc<Generation>,
    local_addr: SocketAddr,
    root_url: String,
    tracker: ConnectionTracker,
    force: CancelSignal,
    accept_task: JoinHandle<()>,
}

impl Instance {
    /// Starts accepting on `listener` under `generation`.
    pub(crate) fn spawn(
        listener: TcpListener,
        local_addr: SocketAddr,
        root_url: String,
        generation: Arc<Generation>,
        routes: Arc<RouteTable>,
        keep_alive: bool,
    ) -> Self {
        let tracker = ConnectionTracker::new();
        let force = CancelSignal::new();

        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&generation),
            routes,
            tracker.clone(),
            force.clone(),
            keep_alive,
        ));

        Self {
            generation,
            local_addr,
            root_url,
            tracker,
            force,
            accept_task,
        }
    }

    pub(crate) fn generation(&self) -> &Arc<Generation> {
        &self.generation
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) fn root_url(&self) -> &str {
        &self.root_url
    }

    /// Stops the instance, waiting at most `timeout` for connections
    /// before force-closing them.
    pub(crate) async fn drain(self, timeout: Duration) -> DrainOutcome {
        let generation = self.generation.id();
        self.generation.cancel();

        if let Err(e) = self.accept_task.await {
            tracing::warn!(generation, error = %e, "accept loop ended abnormally");
        }

        let active = self.tracker.active_connections();
        tracing::debug!(generation, active, ?timeout, "draining connections");

        if self.tracker.wait_idle_for(timeout).await {
            return DrainOutcome::Graceful;
        }

        let remaining = self.tracker.active_connections();
        tracing::warn!(
            generation,
            remaining,
            ?timeout,
            "drain timed out, force-closing connections"
        );
        self.force.cancel();
        record_forced_drain();

        if !self.tracker.wait_idle_for(FORCE_CLOSE_GRACE).await {
            tracing::warn!(
                generation,
                remaining = self.tracker.active_connections(),
                "connections still unwinding after force close"
            );
        }

        DrainOutcome::Forced { remaining }
    }
}

async fn accept_loop(
    listener: TcpListener,
    generation: Arc<Generation>,
    routes: Arc<RouteTable>,
    tracker: ConnectionTracker,
    force: CancelSignal,
    keep_alive: bool,
) {
    let root = generation.root_context();

    loop {
        tokio::select! {
            biased;

            () = generation.signal().cancelled() => break,

            result = listener.accept() => match result {
                Ok((stream, remote_addr)) => {
                    let token = tracker.acquire();
                    tokio::spawn(serve_connection(
                        stream,
                        remote_addr,
                        root.clone(),
                        Arc::clone(&routes),
                        force.clone(),
                        keep_alive,
                        token,
                    ));
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    tracing::debug!(generation = generation.id(), "listener closed");
}

async fn serve_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    root: Context,
    routes: Arc<RouteTable>,
    force: CancelSignal,
    keep_alive: bool,
    token: ConnectionToken,
) {
    let _token = token;
    let _gauge = ConnectionGauge::new();

    let io = TokioIo::new(stream);
    let service_root = root.clone();
    let service = service_fn(move |req: http::Request<Incoming>| {
        let root = service_root.clone();
        let routes = Arc::clone(&routes);
        async move { Ok::<_, Infallible>(handle_request(&routes, &root, req).await) }
    });

    let conn = http1::Builder::new()
        .keep_alive(keep_alive)
        .serve_connection(io, service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        () = root.cancelled() => {
            conn.as_mut().graceful_shutdown();
            tokio::select! {
                result = conn.as_mut() => result,
                () = force.cancelled() => {
                    tracing::debug!(%remote_addr, "connection force-closed");
                    Ok(())
                }
            }
        }
    };

    if let Err(e) = result {
        tracing::debug!(%remote_addr, error = %e, "connection error");
    }
}

async fn handle_request(
    routes: &RouteTable,
    root: &Context,
    req: http::Request<Incoming>,
) -> HttpResponse {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::debug!(error = %e, "failed to read request body");
            let mut response = HttpResponse::default();
            *response.status_mut() = StatusCode::BAD_REQUEST;
            return response;
        }
    };

    routes
        .dispatch(root, http::Request::from_parts(parts, body))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_core::Settings;

    #[test]
    fn test_state_display() {
        assert_eq!(ServerState::Idle.to_string(), "idle");
        assert_eq!(ServerState::Running.to_string(), "running");
        assert_eq!(ServerState::Stopping.to_string(), "stopping");
    }

    #[tokio::test]
    async fn test_idle_instance_drains_gracefully() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let local_addr = listener.local_addr().unwrap();
        let generation = Arc::new(Generation::new(1, Settings::new()).unwrap());

        let instance = Instance::spawn(
            listener,
            local_addr,
            format!("http://{local_addr}"),
            Arc::clone(&generation),
            Arc::new(RouteTable::new()),
            true,
        );
        assert_eq!(instance.local_addr(), local_addr);
        assert_eq!(instance.generation().id(), 1);

        let outcome = instance.drain(Duration::from_millis(100)).await;

        assert_eq!(outcome, DrainOutcome::Graceful);
        assert!(generation.is_cancelled());
        assert!(TcpStream::connect(local_addr).await.is_err());
    }

    #[tokio::test]
    async fn test_stuck_handler_is_force_closed() {
        let routes = Arc::new(RouteTable::new());
        let stuck: crate::handler::SharedHandler = Arc::new(
            |_ctx: Context, _res: crate::ResponseWriter, _req: crate::Request| async move {
                std::future::pending::<()>().await;
            },
        );
        routes.insert(lantern_router::Method::Get, "/stuck", stuck).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let local_addr = listener.local_addr().unwrap();
        let generation = Arc::new(Generation::new(2, Settings::new()).unwrap());
        let instance = Instance::spawn(
            listener,
            local_addr,
            format!("http://{local_addr}"),
            generation,
            routes,
            true,
        );

        let mut client = TcpStream::connect(local_addr).await.unwrap();
        let head = b"GET /stuck HTTP/1.1\r\nHost: x\r\n\r\n";
        tokio::io::AsyncWriteExt::write_all(&mut client, head)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = std::time::Instant::now();
        let outcome = instance.drain(Duration::from_millis(50)).await;

        assert!(matches!(outcome, DrainOutcome::Forced { remaining: 1 }));
        assert!(started.elapsed() < Duration::from_secs(1));

        // The server closed the socket without answering.
        let mut buf = Vec::new();
        let read = tokio::time::timeout(
            Duration::from_secs(1),
            tokio::io::AsyncReadExt::read_to_end(&mut client, &mut buf),
        )
        .await
        .expect("socket should be closed");
        assert!(read.is_err() || buf.is_empty());
    }
}
