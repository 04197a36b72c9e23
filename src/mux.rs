//! The multiplexer front.
//!
//! [`ServeMux`] owns the default routing tree and any per-host trees, and
//! turns an incoming request into a composed middleware-and-handler
//! invocation. Registration takes `&mut self` and matching takes `&self`, so
//! the build-then-serve discipline is enforced by the borrow checker: once
//! the mux is shared behind an `Arc`, the tree can no longer change.

use crate::error::{InsertError, MatchError};
use crate::execution::ExecutionPool;
use crate::handler::{self, Handler, HandlerFuture, Middleware, Next};
use crate::tree::{MethodKey, Route};
use http::{header, Request, StatusCode};
use hyper::Body;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Route data published on the request extensions after a match, consumed by
/// the [`path_param`], [`path_params`] and [`matched_pattern`] accessors.
#[derive(Clone, Debug, Default)]
struct RouteInfo {
    pattern: String,
    params: HashMap<String, String>,
}

/// Returns the value of the named path parameter captured for this request.
///
/// For the route `/users/:name` and the request path `/users/andrew`,
/// `path_param(&req, "name")` is `"andrew"`. Unset parameters return an
/// empty string.
pub fn path_param<B>(req: &Request<B>, name: &str) -> String {
    req.extensions()
        .get::<RouteInfo>()
        .and_then(|info| info.params.get(name))
        .cloned()
        .unwrap_or_default()
}

/// Returns a snapshot of all path parameters captured for this request.
///
/// The returned map is a copy; altering it does not affect future calls to
/// [`path_param`] or [`path_params`].
pub fn path_params<B>(req: &Request<B>) -> HashMap<String, String> {
    req.extensions()
        .get::<RouteInfo>()
        .map(|info| info.params.clone())
        .unwrap_or_default()
}

/// Returns the pattern the multiplexer used to serve this request, without
/// parameter substitution (`/users/:id`, not `/users/42`).
///
/// Empty when the request was not dispatched through a [`ServeMux`].
pub fn matched_pattern<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<RouteInfo>()
        .map(|info| info.pattern.clone())
        .unwrap_or_default()
}

/// The multiplexer for HTTP requests.
///
/// ```
/// use http::{Request, Response, StatusCode};
/// use hyper::Body;
/// use segmux::ServeMux;
///
/// async fn show_user(req: Request<Body>) -> Result<Response<Body>, hyper::Error> {
///     let id = segmux::path_param(&req, "id");
///     Ok(Response::new(Body::from(format!("user {}", id))))
/// }
///
/// let mut mux = ServeMux::new();
/// mux.route("/users/:id").get(show_user);
///
/// let req = Request::get("/users/42").body(Body::empty()).unwrap();
/// let res = futures::executor::block_on(mux.dispatch(req)).unwrap();
/// assert_eq!(res.status(), StatusCode::OK);
/// ```
pub struct ServeMux {
    base: Route,
    host_roots: HashMap<String, Route>,
    pool: ExecutionPool,
}

impl ServeMux {
    /// Creates a new multiplexer with a default not-found handler at the
    /// root.
    pub fn new() -> ServeMux {
        let mut base = Route::new_root();
        base.set(MethodKey::NotFound, handler::not_found());
        ServeMux {
            base,
            host_roots: HashMap::new(),
            pool: ExecutionPool::new(),
        }
    }

    /// Returns the route for `path` on the default tree, creating it as
    /// needed.
    ///
    /// # Panics
    ///
    /// Panics on route conflicts; see [`Route::route`].
    pub fn route(&mut self, path: &str) -> &mut Route {
        self.base.route(path)
    }

    /// Fallible form of [`ServeMux::route`].
    pub fn try_route(&mut self, path: &str) -> Result<&mut Route, InsertError> {
        self.base.try_route(path)
    }

    /// Returns the route for `path` on the tree serving `host`, creating
    /// both as needed. Hosts are compared byte-exact against the request
    /// authority; there is no normalisation.
    ///
    /// # Panics
    ///
    /// Panics on route conflicts; see [`Route::route`].
    pub fn route_host(&mut self, host: &str, path: &str) -> &mut Route {
        self.host_roots
            .entry(host.to_string())
            .or_insert_with(Route::new_root)
            .route(path)
    }

    /// Registers `handler` for every method on `path`, equivalent to
    /// `route(path).any(handler)`.
    pub fn handle<H: Handler + 'static>(&mut self, path: &str, handler: H) {
        self.route(path).any(handler);
    }

    /// Registers `handler` for every method on `path` for a specific host.
    pub fn handle_host<H: Handler + 'static>(&mut self, host: &str, path: &str, handler: H) {
        self.route_host(host, path).any(handler);
    }

    /// Attaches middleware at `path`; it runs for every request whose path
    /// crosses that node.
    pub fn middleware<M: Middleware + 'static>(&mut self, path: &str, middleware: M) {
        self.route(path).middleware(middleware);
    }

    /// Attaches middleware at `path` for a specific host.
    pub fn middleware_host<M: Middleware + 'static>(
        &mut self,
        host: &str,
        path: &str,
        middleware: M,
    ) {
        self.route_host(host, path).middleware(middleware);
    }

    /// Replaces the default not-found handler.
    pub fn not_found<H: Handler + 'static>(&mut self, handler: H) {
        self.base.not_found(handler);
    }

    /// Dispatches the request to the handler whose pattern most closely
    /// matches the request path, threading the collected middleware around
    /// it.
    pub fn dispatch(&self, mut req: Request<Body>) -> HandlerFuture {
        tracing::trace!(method = %req.method(), path = req.uri().path(), "dispatching request");

        let (handler, middleware, pattern, params) = match self.lookup(&req) {
            Ok(parts) => parts,
            Err(err) => {
                tracing::debug!(%err, "rejecting request");
                (handler::bad_request(), Vec::new(), String::new(), HashMap::new())
            }
        };

        req.extensions_mut().insert(RouteInfo { pattern, params });

        Next::new(middleware, handler).run(req)
    }

    /// Returns the handler that would serve this request and the pattern it
    /// matched, without invoking anything. For paths in non-canonical form
    /// the handler is the internally generated redirect and the pattern is
    /// the canonical path.
    pub fn handler_for<B>(&self, req: &Request<B>) -> (Arc<dyn Handler>, String) {
        let (handler, _, pattern) = self.handler_and_middleware(req);
        (handler, pattern)
    }

    /// Like [`ServeMux::handler_for`], with the middleware that would run,
    /// in execution order.
    pub fn handler_and_middleware<B>(
        &self,
        req: &Request<B>,
    ) -> (Arc<dyn Handler>, Vec<Arc<dyn Middleware>>, String) {
        match self.lookup(req) {
            Ok((handler, middleware, pattern, _)) => (handler, middleware, pattern),
            Err(_) => (handler::bad_request(), Vec::new(), String::new()),
        }
    }

    /// The complete per-request resolution: redirect check, host root
    /// selection, tree walk, and not-found substitution.
    #[allow(clippy::type_complexity)]
    fn lookup<B>(
        &self,
        req: &Request<B>,
    ) -> Result<
        (
            Arc<dyn Handler>,
            Vec<Arc<dyn Middleware>>,
            String,
            HashMap<String, String>,
        ),
        MatchError,
    > {
        let path = req.uri().path();

        // canonicalise the trailing slash before consulting the tree
        if path != "/" && path.ends_with('/') {
            let mut target = path.trim_end_matches('/').to_string();
            if target.is_empty() {
                target.push('/');
            }
            let pattern = target.clone();
            if let Some(query) = req.uri().query() {
                target.push('?');
                target.push_str(query);
            }
            tracing::debug!(path, target = %target, "redirecting trailing slash");
            return Ok((
                handler::redirect(target, StatusCode::PERMANENT_REDIRECT),
                Vec::new(),
                pattern,
                HashMap::new(),
            ));
        }

        let root = self.host_root(req);

        let mut ex = self.pool.acquire();
        if let Err(err) = root.fill_execution(req.method(), path, &mut ex) {
            self.pool.release(ex);
            return Err(err);
        }

        let handler = match ex.handler.take() {
            Some(handler) => handler,
            None => {
                tracing::debug!(path, "no handler matched, falling back to not-found");
                ex.not_found.take().unwrap_or_else(handler::not_found)
            }
        };
        let middleware = std::mem::take(&mut ex.middleware);
        let pattern = std::mem::take(&mut ex.pattern);
        let params = ex.params.drain(..).collect();
        self.pool.release(ex);

        Ok((handler, middleware, pattern, params))
    }

    /// Selects the routing tree for the request's host, falling back to the
    /// default tree.
    fn host_root<B>(&self, req: &Request<B>) -> &Route {
        if self.host_roots.is_empty() {
            return &self.base;
        }

        let host = req
            .uri()
            .host()
            .or_else(|| {
                req.headers()
                    .get(header::HOST)
                    .and_then(|value| value.to_str().ok())
            })
            .unwrap_or("");

        self.host_roots.get(host).unwrap_or(&self.base)
    }
}

impl Default for ServeMux {
    fn default() -> ServeMux {
        ServeMux::new()
    }
}

/// Lists every registered route, one `<path>\t[<methods>]` line per node
/// holding at least one handler. Per-host routes are prefixed with the host.
impl fmt::Display for ServeMux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes = Vec::new();
        self.base.string_routes(&mut routes);
        for route in &routes {
            writeln!(f, "{}", route)?;
        }

        let mut hosts: Vec<&String> = self.host_roots.keys().collect();
        hosts.sort();
        for host in hosts {
            routes.clear();
            self.host_roots[host].string_routes(&mut routes);
            for route in &routes {
                writeln!(f, "{}{}", host, route)?;
            }
        }

        Ok(())
    }
}
