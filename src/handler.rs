//! Handler and middleware contracts.
//!
//! User code supplies [`Handler`]s and [`Middleware`]s; both are stored in
//! the routing tree as `Arc` trait objects and shared across requests. Plain
//! `async fn`s and closures implement the traits directly.

use futures::future::{ok, BoxFuture};
use http::{header, Request, Response, StatusCode};
use hyper::Body;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

/// The future returned by handlers and middleware.
pub type HandlerFuture = BoxFuture<'static, Result<Response<Body>, hyper::Error>>;

/// An asynchronous request handler.
///
/// Implemented for any `Fn(Request<Body>)` returning a future of
/// `Result<Response<Body>, hyper::Error>`, so plain `async fn`s register
/// directly:
///
/// ```
/// use http::{Request, Response};
/// use hyper::Body;
/// use segmux::ServeMux;
///
/// async fn ping(_: Request<Body>) -> Result<Response<Body>, hyper::Error> {
///     Ok(Response::new(Body::from("pong")))
/// }
///
/// let mut mux = ServeMux::new();
/// mux.route("/ping").get(ping);
/// ```
pub trait Handler: Send + Sync {
    /// Process the request and produce a response.
    fn call(&self, req: Request<Body>) -> HandlerFuture;
}

impl<F, R> Handler for F
where
    F: Fn(Request<Body>) -> R + Send + Sync,
    R: Future<Output = Result<Response<Body>, hyper::Error>> + Send + 'static,
{
    fn call(&self, req: Request<Body>) -> HandlerFuture {
        Box::pin(self(req))
    }
}

/// A middleware invoked for every request whose path crosses the node it is
/// attached to.
///
/// A middleware receives the request and the rest of the chain; it decides
/// whether to call [`Next::run`] or to answer the request itself.
pub trait Middleware: Send + Sync {
    /// Process the request, optionally delegating to the rest of the chain.
    fn handle(&self, req: Request<Body>, next: Next) -> HandlerFuture;
}

impl<F, R> Middleware for F
where
    F: Fn(Request<Body>, Next) -> R + Send + Sync,
    R: Future<Output = Result<Response<Body>, hyper::Error>> + Send + 'static,
{
    fn handle(&self, req: Request<Body>, next: Next) -> HandlerFuture {
        Box::pin(self(req, next))
    }
}

/// The remainder of a middleware chain: the middleware not yet run, in
/// attachment order, and the final handler.
pub struct Next {
    middleware: VecDeque<Arc<dyn Middleware>>,
    handler: Arc<dyn Handler>,
}

impl Next {
    pub(crate) fn new(middleware: Vec<Arc<dyn Middleware>>, handler: Arc<dyn Handler>) -> Self {
        Next {
            middleware: middleware.into(),
            handler,
        }
    }

    /// Runs the rest of the chain.
    pub fn run(mut self, req: Request<Body>) -> HandlerFuture {
        match self.middleware.pop_front() {
            Some(mw) => mw.handle(req, self),
            None => self.handler.call(req),
        }
    }
}

/// The fallback `404 Not Found` responder, registered at the root of every
/// new multiplexer.
pub(crate) fn not_found() -> Arc<dyn Handler> {
    Arc::new(|_: Request<Body>| {
        ok::<_, hyper::Error>(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("404 page not found\n"))
            .unwrap())
    })
}

/// Responder for parameter values that fail percent-decoding.
pub(crate) fn bad_request() -> Arc<dyn Handler> {
    Arc::new(|_: Request<Body>| {
        ok::<_, hyper::Error>(Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .body(Body::from("400 bad request\n"))
            .unwrap())
    })
}

/// Generated `405 Method Not Allowed` responder. Regenerated per request so
/// routes added after startup are reflected in the `Allow` header.
pub(crate) fn method_not_allowed(allow: String) -> Arc<dyn Handler> {
    Arc::new(move |_: Request<Body>| {
        ok::<_, hyper::Error>(Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header(header::ALLOW, allow.clone())
            .body(Body::empty())
            .unwrap())
    })
}

/// Generated default `OPTIONS` responder listing the methods registered at
/// the matched node.
pub(crate) fn default_options(allow: String) -> Arc<dyn Handler> {
    Arc::new(move |_: Request<Body>| {
        ok::<_, hyper::Error>(Response::builder()
            .status(StatusCode::OK)
            .header(header::ALLOW, allow.clone())
            .body(Body::empty())
            .unwrap())
    })
}

/// Generated redirect responder.
pub(crate) fn redirect(location: String, status: StatusCode) -> Arc<dyn Handler> {
    Arc::new(move |_: Request<Body>| {
        ok::<_, hyper::Error>(Response::builder()
            .status(status)
            .header(header::LOCATION, location.clone())
            .body(Body::empty())
            .unwrap())
    })
}
