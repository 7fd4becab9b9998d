//! The shared route table and request dispatch.
//!
//! Routes may be registered at any time, including while requests are
//! being served. The table sits behind a `parking_lot::RwLock`: an insert
//! takes the write lock for the duration of one tree insertion, and
//! dispatch holds the read lock only long enough to clone the matched
//! handler out. A request therefore sees either the whole route or none
//! of it, and a slow handler never blocks registration.

use std::time::Instant;

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::{Response, StatusCode};
use http_body_util::Full;
use lantern_core::{keys, Context, RequestId};
use lantern_router::{Lookup, Method, Params, RouteError, Router};
use parking_lot::RwLock;
use tracing::Instrument;

use crate::handler::{HttpResponse, Request, ResponseWriter, SharedHandler};

/// Owned outcome of a lookup, detached from the table's lock.
pub(crate) enum Resolved {
    Found {
        handler: SharedHandler,
        params: Params,
        pattern: String,
    },
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Thread-safe route table shared by the server and its connections.
#[derive(Default)]
pub struct RouteTable {
    router: RwLock<Router<SharedHandler>>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler.
    ///
    /// # Errors
    ///
    /// Returns the router's [`RouteError`] for malformed or conflicting
    /// patterns; the table is left unchanged.
    pub fn insert(
        &self,
        method: Method,
        pattern: &str,
        handler: SharedHandler,
    ) -> Result<(), RouteError> {
        self.router.write().insert(method, pattern, handler)?;
        tracing::debug!(%method, pattern, "registered route");
        Ok(())
    }

    /// Returns the registered (method, pattern) pairs.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.router.read().routes().to_vec()
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.router.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.router.read().is_empty()
    }

    pub(crate) fn resolve(&self, method: &http::Method, path: &str) -> Resolved {
        let router = self.router.read();
        match router.lookup_http(method, path) {
            Lookup::Found(found) => Resolved::Found {
                handler: SharedHandler::clone(found.handler),
                params: found.params,
                pattern: found.pattern.to_string(),
            },
            Lookup::MethodNotAllowed { allowed } => Resolved::MethodNotAllowed(allowed),
            Lookup::NotFound => Resolved::NotFound,
        }
    }

    /// Routes one request and runs its handler to completion.
    ///
    /// `root` is the generation context captured by the connection, so
    /// the request observes that generation even if the server has since
    /// been restarted.
    ///
    /// The response is whatever the [`ResponseWriter`] holds when it is
    /// dropped. A handler that moves its writer into another task is
    /// answered when that task drops it; a writer that is never dropped
    /// holds the connection open until a forced drain closes it.
    pub(crate) async fn dispatch(&self, root: &Context, req: Request) -> HttpResponse {
        let started = Instant::now();
        let request_id = RequestId::new();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let span = tracing::debug_span!(
            "request",
            request_id = %request_id,
            http.method = %method,
            http.path = %path,
            generation = root.generation_id(),
        );

        let response = async {
            match self.resolve(&method, &path) {
                Resolved::Found {
                    handler,
                    params,
                    pattern,
                } => {
                    tracing::debug!(route = %pattern, "dispatching");
                    let mut ctx = root.with_value(keys::REQUEST_ID, request_id);
                    for (name, value) in params {
                        ctx = ctx.with_value(name, value);
                    }

                    let (writer, rx) = ResponseWriter::channel();
                    handler.call(ctx, writer, req).await;
                    // The writer sends on every drop, so the channel never
                    // closes empty.
                    rx.await.unwrap_or_default()
                }
                Resolved::MethodNotAllowed(allowed) => method_not_allowed(&method, &allowed),
                Resolved::NotFound => not_found(&path),
            }
        }
        .instrument(span.clone())
        .await;

        span.in_scope(|| {
            tracing::debug!(
                http.status_code = response.status().as_u16(),
                duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "request completed"
            );
        });
        lantern_telemetry::metrics::record_request(
            method.as_str(),
            response.status().as_u16(),
            started.elapsed(),
        );

        response
    }
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// 404 for a path no route matches.
pub(crate) fn not_found(path: &str) -> HttpResponse {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": "Not Found",
            "path": path
        }),
    )
}

/// 405 for a path that only matches under other methods.
pub(crate) fn method_not_allowed(method: &http::Method, allowed: &[Method]) -> HttpResponse {
    let names: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
    let allow = names.join(", ");

    let mut response = json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({
            "error": "Method Not Allowed",
            "method": method.as_str(),
            "allowed": names
        }),
    );
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}
