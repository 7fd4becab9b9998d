//! # Lantern
//!
//! An HTTP server built to live inside another program. The host starts
//! it when its UI needs a local backend, stops it when the UI goes away,
//! and can restart it as often as it likes on the same address.
//!
//! - **Parameterized routing**: exact segments, `:name` parameters and a
//!   trailing `*rest` wildcard, registered at any time
//! - **Settings generations**: each start hands its settings to every
//!   handler through the request [`Context`](prelude::Context)
//! - **Bounded shutdown**: handlers are told to stop, then disconnected
//!   once the drain timeout expires
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use lantern::prelude::*;
//!
//! async fn greet(ctx: Context, mut res: ResponseWriter, _req: Request) {
//!     let greeting = ctx.str_value("greeting").unwrap_or("Hello");
//!     let name = ctx.str_value("name").unwrap_or("Stranger");
//!     res.write_str(&format!("{greeting}, {name}"));
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ServerError> {
//!     let server = Server::new();
//!     server.handle(Method::Get, "/:name", greet)?;
//!
//!     let url = server
//!         .start("127.0.0.1:0", Settings::new().with("greeting", "Namaste".to_string()))
//!         .await?;
//!     println!("try {url}/Alice");
//!
//!     server.stop(Duration::from_millis(100)).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! ```text
//! lantern-router     path patterns, route tree, method dispatch
//! lantern-core       settings, generations, request context, cancellation
//! lantern-server     lifecycle, connection tracking, handler contract
//! lantern-telemetry  logging and metrics
//! ```

#![doc(html_root_url = "https://docs.rs/lantern/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use lantern_core as core;
pub use lantern_router as router;
pub use lantern_server as server;
pub use lantern_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use lantern::prelude::*;
///
/// let server = Server::new();
/// assert_eq!(server.state(), ServerState::Idle);
/// ```
pub mod prelude {
    pub use lantern_core::{CancelSignal, Context, RequestId, Settings};

    pub use lantern_router::{Method, RouteError};

    pub use lantern_server::embedded::{EmbeddedServer, RuntimeConfig};
    pub use lantern_server::handler::ignore_context;
    pub use lantern_server::{
        Handler, Request, ResponseWriter, Server, ServerConfig, ServerError, ServerResult,
        ServerState,
    };

    pub use lantern_telemetry::{init_logging, LogConfig};
}
