//! The handler contract.
//!
//! A handler receives three things: the request [`Context`] (route
//! parameters layered over the generation's settings, plus its
//! cancellation signal), a [`ResponseWriter`] to fill in, and the
//! [`Request`] with its body already collected.
//!
//! Handlers return nothing. Whatever the writer holds when it is dropped
//! is what the client receives.
//!
//! # Example
//!
//! ```rust
//! use lantern_server::{Context, Request, ResponseWriter};
//!
//! async fn hello(ctx: Context, mut res: ResponseWriter, _req: Request) {
//!     let greeting = ctx.str_value("greeting").unwrap_or("Hello");
//!     let name = ctx.str_value("name").unwrap_or("Stranger");
//!     res.write_str(&format!("{greeting}, {name}"));
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH};
use http::{HeaderMap, Response, StatusCode};
use http_body_util::Full;
use lantern_core::Context;
use tokio::sync::oneshot;

/// A request as seen by handlers: head plus fully collected body.
pub type Request = http::Request<Bytes>;

/// The response type produced for every request.
pub type HttpResponse = Response<Full<Bytes>>;

/// Boxed future returned by [`Handler::call`].
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A type-erased, shareable handler.
pub type SharedHandler = Arc<dyn Handler>;

/// Something that can serve a request.
///
/// Implemented for every `Fn(Context, ResponseWriter, Request) -> impl
/// Future<Output = ()>` closure or async fn, so most code never names
/// this trait.
pub trait Handler: Send + Sync + 'static {
    /// Serves one request.
    fn call(&self, ctx: Context, res: ResponseWriter, req: Request) -> BoxFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Context, ResponseWriter, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, ctx: Context, res: ResponseWriter, req: Request) -> BoxFuture {
        Box::pin(self(ctx, res, req))
    }
}

/// Adapts a handler that has no use for the context.
///
/// Only suitable for quick handlers: the wrapped function never sees the
/// cancellation signal, so a slow one is only stopped by a forced drain.
///
/// ```rust
/// use lantern_server::handler::ignore_context;
/// use lantern_server::{Request, ResponseWriter};
///
/// let handler = ignore_context(|mut res: ResponseWriter, _req: Request| async move {
///     res.write_str("pong");
/// });
/// # let _ = handler;
/// ```
pub fn ignore_context<F, Fut>(f: F) -> impl Handler
where
    F: Fn(ResponseWriter, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    move |_ctx: Context, res: ResponseWriter, req: Request| f(res, req)
}

/// The response sink handed to each handler.
///
/// Starts as `200 OK` with no headers and an empty body. The response is
/// sent when the writer is dropped, which normally happens when the
/// handler returns; a handler may also move it into another task and
/// finish there.
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    tx: Option<oneshot::Sender<HttpResponse>>,
}

impl ResponseWriter {
    /// Creates a writer and the receiver its response will arrive on.
    pub(crate) fn channel() -> (Self, oneshot::Receiver<HttpResponse>) {
        let (tx, rx) = oneshot::channel();
        let writer = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            tx: Some(tx),
        };
        (writer, rx)
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the status code set so far.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets a header, replacing any previous value.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Returns the headers for in-place edits.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Appends bytes to the body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Appends text to the body.
    pub fn write_str(&mut self, text: &str) {
        self.write(text.as_bytes());
    }

    /// Returns the number of body bytes written so far.
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    fn finish(&mut self) -> HttpResponse {
        let body = std::mem::take(&mut self.body).freeze();
        let mut response = Response::new(Full::new(body));
        *response.status_mut() = self.status;
        *response.headers_mut() = std::mem::take(&mut self.headers);
        response.headers_mut().remove(CONTENT_LENGTH);
        response
    }
}

impl fmt::Write for ResponseWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s.as_bytes());
        Ok(())
    }
}

impl Drop for ResponseWriter {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let response = self.finish();
            // The receiver is gone when the connection was force-closed.
            let _ = tx.send(response);
        }
    }
}

impl fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}
