//! # Lantern Server
//!
//! A small HTTP/1.1 server meant to run inside another application (a
//! mobile app serving its own WebView, a desktop tool serving a local UI)
//! and to be started, stopped and restarted as often as the host likes.
//!
//! - Parameterized routing via [`lantern_router`]; routes may be added
//!   while serving
//! - Per-start settings and a cancellation signal delivered to every
//!   handler through its [`Context`]
//! - Liveness verification on start; bounded, then forced, drain on stop
//! - A blocking [`EmbeddedServer`](embedded::EmbeddedServer) for hosts
//!   without a runtime
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use lantern_server::{Context, Method, Request, ResponseWriter, Server, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lantern_server::ServerError> {
//!     let server = Server::new();
//!     server.handle_fn(Method::Get, "/work", |ctx: Context, mut res: ResponseWriter, _req| {
//!         async move {
//!             tokio::select! {
//!                 () = ctx.cancelled() => res.write_str("abandoned"),
//!                 () = tokio::time::sleep(Duration::from_secs(5)) => res.write_str("done"),
//!             }
//!         }
//!     })?;
//!
//!     let url = server.start("127.0.0.1:0", Settings::new()).await?;
//!     println!("listening on {url}");
//!
//!     server.stop(Duration::from_millis(150)).await;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/lantern-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod embedded;
mod error;
pub mod handler;
mod lifecycle;
mod routes;
mod server;
pub mod shutdown;
pub mod verify;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::{ServerError, ServerResult};
pub use handler::{Handler, HttpResponse, Request, ResponseWriter, SharedHandler};
pub use lifecycle::{ServerState, FORCE_CLOSE_GRACE};
pub use routes::RouteTable;
pub use server::Server;

pub use lantern_core::{keys, CancelSignal, Context, RequestId, Settings};
pub use lantern_router::Method;
