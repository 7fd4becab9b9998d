//! Server error types.

use std::io;
use std::net::SocketAddr;

use lantern_core::ContextError;
use lantern_router::RouteError;
use thiserror::Error;

/// Errors returned by the server's registration and lifecycle surface.
///
/// `Stop` never fails, so nothing here describes a shutdown problem.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listener could not be bound (address in use, no permission,
    /// unparsable address).
    #[error("could not listen on {addr}: {source}")]
    Bind {
        /// The address that was requested.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The listener was bound but never answered a dial within the
    /// verification budget. The instance has been torn down.
    #[error("server at {addr} did not accept a connection after {attempts} attempts")]
    StartupVerification {
        /// The bound address that was dialled.
        addr: SocketAddr,
        /// Number of dial attempts made.
        attempts: u32,
    },

    /// Route registration failed.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// The settings passed to start were rejected.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The blocking facade could not build its runtime.
    #[error("failed to build runtime: {0}")]
    Runtime(#[source] io::Error),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ServerError {
    /// Returns true for [`ServerError::Bind`].
    ///
    /// Bind failures are the only retryable start error.
    #[must_use]
    pub fn is_bind(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }
}

/// Result type alias using [`ServerError`].
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_router::{Method, Router};

    #[test]
    fn test_bind_error_display() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:1".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert_eq!(err.to_string(), "could not listen on 127.0.0.1:1: permission denied");
        assert!(err.is_bind());
    }

    #[test]
    fn test_route_error_is_transparent() {
        let mut router = Router::new();
        router.insert(Method::Get, "/a", ()).unwrap();
        let route_err = router.insert(Method::Get, "/a", ()).unwrap_err();
        let expected = route_err.to_string();

        let err = ServerError::from(route_err);
        assert_eq!(err.to_string(), expected);
        assert!(!err.is_bind());
    }

    #[test]
    fn test_context_error_converts() {
        let err: ServerError = ContextError::ReservedKey {
            key: "lantern.x".to_string(),
        }
        .into();
        assert!(matches!(err, ServerError::Context(_)));
    }
}
