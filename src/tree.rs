//! The routing tree.
//!
//! Each [`Route`] is one node of a segmented trie. Literal children are kept
//! sorted for binary search; at most one parameter child and one wildcard
//! child may exist per node. Descent commits at every level: literal beats
//! parameter beats wildcard, and there is no backtracking.

use crate::error::{InsertError, MatchError};
use crate::execution::RouteExecution;
use crate::handler::{self, Handler, Middleware};
use crate::segment::{self, Segment};
use http::{Method, StatusCode};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::sync::Arc;

/// Handler table key: the standard HTTP methods plus the two synthetic
/// tokens, which can never collide with a real method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum MethodKey {
    Http(Method),
    Any,
    NotFound,
}

impl MethodKey {
    fn token(&self) -> &str {
        match self {
            MethodKey::Http(method) => method.as_str(),
            MethodKey::Any => "ANY",
            MethodKey::NotFound => "NOT_FOUND",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RouteKind {
    Root,
    Literal,
    Param { name: String },
    Wildcard,
}

/// A single node in the routing tree: an absolute path, a path parameter, or
/// a rooted subtree.
///
/// Routes are created through [`ServeMux::route`](crate::ServeMux::route) (or
/// [`Route::route`] for chained insertion) and configured with the
/// per-method registration methods, all of which return `&mut Self` so
/// registrations chain:
///
/// ```
/// use http::{Request, Response};
/// use hyper::Body;
/// use segmux::ServeMux;
///
/// async fn show(_: Request<Body>) -> Result<Response<Body>, hyper::Error> {
///     Ok(Response::new(Body::from("user")))
/// }
///
/// async fn remove(_: Request<Body>) -> Result<Response<Body>, hyper::Error> {
///     Ok(Response::new(Body::empty()))
/// }
///
/// let mut mux = ServeMux::new();
/// mux.route("/users/:id").get(show).delete(remove);
/// ```
pub struct Route {
    /// The segment fragment this node matches; empty for the root.
    pattern: String,
    /// The canonical path from the root to this node; empty for the root.
    full_path: String,
    kind: RouteKind,
    /// Middleware this node contributes, in attachment order.
    middleware: Vec<Arc<dyn Middleware>>,
    /// Literal children, sorted ascending by pattern.
    children: Vec<Box<Route>>,
    param_child: Option<Box<Route>>,
    wildcard_child: Option<Box<Route>>,
    handlers: HashMap<MethodKey, Arc<dyn Handler>>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("full_path", &self.full_path)
            .field("kind", &self.kind)
            .field("children", &self.children)
            .field("param_child", &self.param_child)
            .field("wildcard_child", &self.wildcard_child)
            .finish()
    }
}

impl Route {
    pub(crate) fn new_root() -> Route {
        Route {
            pattern: String::new(),
            full_path: String::new(),
            kind: RouteKind::Root,
            middleware: Vec::new(),
            children: Vec::new(),
            param_child: None,
            wildcard_child: None,
            handlers: HashMap::new(),
        }
    }

    fn new_child(pattern: String, parent_path: &str, kind: RouteKind) -> Route {
        let full_path = format!("{}/{}", parent_path, pattern);
        Route {
            pattern,
            full_path,
            kind,
            middleware: Vec::new(),
            children: Vec::new(),
            param_child: None,
            wildcard_child: None,
            handlers: HashMap::new(),
        }
    }

    /// The path reported for this node; the root reports `/`.
    pub fn pattern(&self) -> &str {
        if self.full_path.is_empty() {
            "/"
        } else {
            &self.full_path
        }
    }

    fn param_name(&self) -> &str {
        match &self.kind {
            RouteKind::Param { name } => name,
            _ => "",
        }
    }

    /// Walks down the tree following `path` relative to this node, creating
    /// intermediate nodes as needed, and returns the node representing that
    /// path. Re-routing the same path returns the same node, and chained
    /// calls compose: `route("/a").route("/b")` reaches the same node as
    /// `route("/a/b")`.
    ///
    /// # Panics
    ///
    /// Panics if the path conflicts with existing routes (see
    /// [`InsertError`]); registering routes is configuration, and a
    /// conflicting pattern is a fatal configuration error. Use
    /// [`Route::try_route`] to handle conflicts instead.
    pub fn route(&mut self, path: &str) -> &mut Route {
        match self.try_route(path) {
            Ok(route) => route,
            Err(err) => panic!("segmux: {}", err),
        }
    }

    /// Fallible form of [`Route::route`].
    pub fn try_route(&mut self, path: &str) -> Result<&mut Route, InsertError> {
        // a leading slash is assumed, a trailing slash is dropped
        let mut normalized = String::with_capacity(path.len() + 1);
        if !path.starts_with('/') {
            normalized.push('/');
        }
        normalized.push_str(path);
        while normalized.len() > 1 && normalized.ends_with('/') {
            normalized.pop();
        }

        let segs = segment::segments(&normalized);
        let mut cur = self;
        for seg in segs[1..].iter().copied() {
            cur = cur.child_for(seg)?;
        }
        Ok(cur)
    }

    /// Finds or creates the child matching one pattern segment.
    fn child_for(&mut self, seg: Segment<'_>) -> Result<&mut Route, InsertError> {
        if self.kind == RouteKind::Wildcard {
            return Err(InsertError::ChildOfWildcard {
                at: self.full_path.clone(),
            });
        }

        match seg {
            Segment::Root => Ok(self),
            Segment::Literal(pat) => {
                match self
                    .children
                    .binary_search_by(|child| child.pattern.as_str().cmp(pat))
                {
                    Ok(i) => Ok(&mut self.children[i]),
                    Err(i) => {
                        let child =
                            Route::new_child(pat.to_string(), &self.full_path, RouteKind::Literal);
                        // keep literal siblings sorted for the match-time
                        // binary search
                        self.children.insert(i, Box::new(child));
                        Ok(&mut self.children[i])
                    }
                }
            }
            Segment::Param(name) => {
                if name.is_empty() {
                    return Err(InsertError::UnnamedParam);
                }
                if let Some(existing) = &self.param_child {
                    if existing.param_name() != name {
                        return Err(InsertError::ParamNameConflict {
                            at: existing.full_path.clone(),
                            existing: existing.param_name().to_string(),
                            offered: name.to_string(),
                        });
                    }
                }
                let full_path = self.full_path.as_str();
                Ok(self.param_child.get_or_insert_with(|| {
                    Box::new(Route::new_child(
                        format!(":{}", name),
                        full_path,
                        RouteKind::Param {
                            name: name.to_string(),
                        },
                    ))
                }))
            }
            Segment::Wildcard => {
                let full_path = self.full_path.as_str();
                Ok(self.wildcard_child.get_or_insert_with(|| {
                    Box::new(Route::new_child(
                        "*".to_string(),
                        full_path,
                        RouteKind::Wildcard,
                    ))
                }))
            }
        }
    }

    /// Fills `ex` by walking the tree for `path`.
    ///
    /// The walk appends crossed middleware, keeps the deepest NotFound (and,
    /// for OPTIONS requests, the deepest OPTIONS handler), binds decoded
    /// parameter values, and selects the final handler at the terminal node.
    /// `path` must be the raw, still percent-encoded request path.
    pub(crate) fn fill_execution(
        &self,
        method: &Method,
        path: &str,
        ex: &mut RouteExecution,
    ) -> Result<(), MatchError> {
        let parts = segment::split_request_path(path);

        let mut cur = self;
        let mut i = 0;

        loop {
            ex.middleware.extend(cur.middleware.iter().cloned());

            if let Some(h) = cur.handlers.get(&MethodKey::NotFound) {
                ex.not_found = Some(h.clone());
            }

            // an OPTIONS handler answers for everything below it unless a
            // deeper one takes over
            if *method == Method::OPTIONS {
                if let Some(h) = cur.handlers.get(&MethodKey::Http(Method::OPTIONS)) {
                    ex.handler = Some(h.clone());
                }
            }

            if let RouteKind::Param { name } = &cur.kind {
                let raw = parts[i];
                let value = percent_decode_str(raw).decode_utf8().map_err(|_| {
                    MatchError::InvalidParamEncoding {
                        segment: raw.to_string(),
                    }
                })?;
                ex.params.push((name.clone(), value.into_owned()));
            }

            if i + 1 == parts.len() || cur.kind == RouteKind::Wildcard {
                cur.select_handler(method, ex);
                ex.pattern.push_str(cur.pattern());
                return Ok(());
            }

            let next = parts[i + 1];
            if let Ok(idx) = cur
                .children
                .binary_search_by(|child| child.pattern.as_str().cmp(next))
            {
                cur = &cur.children[idx];
            } else if let Some(param) = &cur.param_child {
                cur = param;
            } else if let Some(wildcard) = &cur.wildcard_child {
                cur = wildcard;
            } else {
                // dead end: leave the handler unset, ancestors may still
                // have contributed a NotFound
                return Ok(());
            }
            i += 1;
        }
    }

    /// Chooses a handler from this node's table.
    ///
    /// Order of precedence:
    /// 1. an exact method match
    /// 2. HEAD requests fall back on GET
    /// 3. the ANY handler
    /// 4. a generated OPTIONS responder, for OPTIONS requests with no
    ///    handler recorded so far
    /// 5. a generated method-not-allowed responder
    ///
    /// A node with no method handlers at all selects nothing; such a node is
    /// a not-found, never a 405.
    fn select_handler(&self, method: &Method, ex: &mut RouteExecution) {
        if let Some(h) = self.handlers.get(&MethodKey::Http(method.clone())) {
            ex.handler = Some(h.clone());
            return;
        }

        if *method == Method::HEAD {
            if let Some(h) = self.handlers.get(&MethodKey::Http(Method::GET)) {
                ex.handler = Some(h.clone());
                return;
            }
        }

        if let Some(h) = self.handlers.get(&MethodKey::Any) {
            ex.handler = Some(h.clone());
            return;
        }

        let allow = self.allow_header();
        if allow.is_empty() {
            return;
        }

        if ex.handler.is_some() {
            // an OPTIONS handler inherited from an ancestor wins over
            // anything generated
            return;
        }

        if *method == Method::OPTIONS {
            ex.handler = Some(handler::default_options(allow));
            return;
        }

        // regenerated on every request so methods registered after startup
        // show up in the Allow header
        ex.handler = Some(handler::method_not_allowed(allow));
    }

    /// The comma-joined list of HTTP methods registered at this node,
    /// excluding the synthetic tokens, sorted for determinism.
    fn allow_header(&self) -> String {
        let mut methods: Vec<&str> = self
            .handlers
            .keys()
            .filter_map(|key| match key {
                MethodKey::Http(method) => Some(method.as_str()),
                _ => None,
            })
            .collect();
        methods.sort_unstable();
        methods.join(", ")
    }

    pub(crate) fn set(&mut self, key: MethodKey, handler: Arc<dyn Handler>) {
        tracing::debug!(route = self.pattern(), method = key.token(), "registered handler");
        self.handlers.insert(key, handler);
    }

    /// Registers a handler for a specific HTTP method, replacing any
    /// previous handler for that method at this node.
    pub fn method<H>(&mut self, method: Method, handler: H) -> &mut Self
    where
        H: Handler + 'static,
    {
        self.set(MethodKey::Http(method), Arc::new(handler));
        self
    }

    /// Registers a catch-all handler for any method sent to this route.
    /// A specific method match takes precedence.
    pub fn any<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.set(MethodKey::Any, Arc::new(handler));
        self
    }

    /// Registers a handler for GET requests. GET handlers also answer HEAD
    /// requests when no specific HEAD handler is registered.
    pub fn get<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.method(Method::GET, handler)
    }

    /// Registers a handler for POST requests.
    pub fn post<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.method(Method::POST, handler)
    }

    /// Registers a handler for PUT requests.
    pub fn put<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.method(Method::PUT, handler)
    }

    /// Registers a handler for PATCH requests.
    pub fn patch<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.method(Method::PATCH, handler)
    }

    /// Registers a handler for DELETE requests.
    pub fn delete<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.method(Method::DELETE, handler)
    }

    /// Registers a handler for HEAD requests.
    pub fn head<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.method(Method::HEAD, handler)
    }

    /// Registers a handler for CONNECT requests.
    pub fn connect<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.method(Method::CONNECT, handler)
    }

    /// Registers a handler for OPTIONS requests. The handler also answers
    /// OPTIONS requests for routes further down the path unless a deeper
    /// OPTIONS handler is registered.
    pub fn options<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.method(Method::OPTIONS, handler)
    }

    /// Registers a handler for requests that reach this point of the tree
    /// but match no deeper route. The deepest NotFound handler along the
    /// request path wins.
    pub fn not_found<H: Handler + 'static>(&mut self, handler: H) -> &mut Self {
        self.set(MethodKey::NotFound, Arc::new(handler));
        self
    }

    /// Answers every method with a redirect to `location`: `308 Permanent
    /// Redirect` when `permanent`, `307 Temporary Redirect` otherwise.
    pub fn redirect(&mut self, location: impl Into<String>, permanent: bool) -> &mut Self {
        let status = if permanent {
            StatusCode::PERMANENT_REDIRECT
        } else {
            StatusCode::TEMPORARY_REDIRECT
        };
        self.set(MethodKey::Any, handler::redirect(location.into(), status));
        self
    }

    /// Attaches a middleware to this route. The middleware runs for every
    /// request whose path crosses this node, in attachment order, before any
    /// middleware attached deeper in the tree.
    pub fn middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Appends one line per descendant node holding at least one handler,
    /// formatted `<path>\t[<method>, …]`.
    pub(crate) fn string_routes(&self, routes: &mut Vec<String>) {
        if !self.handlers.is_empty() {
            let mut methods: Vec<&str> = self
                .handlers
                .keys()
                .filter_map(|key| match key {
                    MethodKey::Http(method) => Some(method.as_str()),
                    _ => None,
                })
                .collect();
            methods.sort_unstable();
            if self.handlers.contains_key(&MethodKey::Any) {
                methods.push("ANY");
            }
            if self.handlers.contains_key(&MethodKey::NotFound) {
                methods.push("NOT_FOUND");
            }
            routes.push(format!("{}\t[{}]", self.pattern(), methods.join(", ")));
        }

        for child in &self.children {
            child.string_routes(routes);
        }
        if let Some(param) = &self.param_child {
            param.string_routes(routes);
        }
        if let Some(wildcard) = &self.wildcard_child {
            wildcard.string_routes(routes);
        }
    }
}
