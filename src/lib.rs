#![deny(rust_2018_idioms)]

//! A segmented-trie HTTP request multiplexer.
//!
//! `segmux` maps request paths to handlers by walking a tree of path
//! segments. Routes may mix absolute paths, named path parameters, and
//! rooted subtrees:
//!
//! ```text
//! Syntax    Type
//! name      literal segment, matches itself byte-for-byte
//! :name     path parameter, matches any single segment and captures it
//! *         wildcard, matches the remainder of the path
//! ```
//!
//! When several patterns match a segment, the most specific wins:
//! literal over parameter over parameter-less wildcard. Descent commits at
//! every level and never backtracks, so `/users/jim` beats `/users/:id`
//! which beats `/users/*`, no matter the registration order.
//!
//! ```rust
//! use http::{Request, Response, StatusCode};
//! use hyper::Body;
//! use segmux::ServeMux;
//!
//! async fn user_info(req: Request<Body>) -> Result<Response<Body>, hyper::Error> {
//!     let id = segmux::path_param(&req, "id");
//!     Ok(Response::new(Body::from(format!("info for {}", id))))
//! }
//!
//! # fn main() {
//! let mut mux = ServeMux::new();
//! mux.route("/users/:id/info").get(user_info);
//!
//! let req = Request::get("/users/jim/info").body(Body::empty()).unwrap();
//! let res = futures::executor::block_on(mux.dispatch(req)).unwrap();
//! assert_eq!(res.status(), StatusCode::OK);
//! # }
//! ```
//!
//! # Method dispatch
//!
//! Handlers are registered per method. At the matched node, an exact method
//! match wins; HEAD requests fall back on the GET handler; the `any` handler
//! catches everything else. Unmatched OPTIONS requests receive a generated
//! `Allow` listing, other unmatched methods a `405 Method Not Allowed`, and
//! paths with no handlers at all the nearest registered not-found handler.
//!
//! # Middleware
//!
//! Middleware attach to routes and run, in attachment order, for every
//! request whose path crosses their node: middleware on `/` sees every
//! request, middleware on `/api` everything below `/api`.
//!
//! # Trailing slashes
//!
//! A request path ending in `/` (other than `/` itself) is answered with a
//! `308 Permanent Redirect` to the same path without the trailing slash; the
//! tree stores patterns without trailing slashes only.
//!
//! # Serving
//!
//! Registration happens on `&mut ServeMux`, matching on `&ServeMux`. Build
//! the full tree first, then share the mux; concurrent matching is read-only
//! and safe from any number of tasks. With the `hyper-server` feature the
//! mux converts into a `hyper` service via
//! [`into_service`](ServeMux::into_service).

mod error;
mod execution;
mod handler;
mod mux;
mod segment;
mod tree;

#[cfg(feature = "hyper-server")]
mod service;

pub use error::{InsertError, MatchError};
pub use handler::{Handler, HandlerFuture, Middleware, Next};
pub use mux::{matched_pattern, path_param, path_params, ServeMux};
pub use tree::Route;

#[cfg(feature = "hyper-server")]
pub use service::{MakeRouterService, RouterService};

#[cfg(doctest)]
mod test_readme {
    macro_rules! doc_comment {
        ($x:expr) => {
            #[doc = $x]
            extern "C" {}
        };
    }

    doc_comment!(include_str!("../README.md"));
}
