//! `hyper` server integration, enabled by the `hyper-server` feature.

use crate::handler::HandlerFuture;
use crate::ServeMux;
use futures::future::{ok, Ready};
use http::{Request, Response};
use hyper::service::Service;
use hyper::Body;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A cloneable `hyper` service that dispatches every request through a
/// shared [`ServeMux`].
#[derive(Clone)]
pub struct RouterService(Arc<ServeMux>);

impl Service<Request<Body>> for RouterService {
    type Response = Response<Body>;
    type Error = hyper::Error;
    type Future = HandlerFuture;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        self.0.dispatch(req)
    }
}

/// The service factory handed to `hyper::Server::serve`, yielding one
/// [`RouterService`] per connection.
pub struct MakeRouterService(RouterService);

impl<T> Service<T> for MakeRouterService {
    type Response = RouterService;
    type Error = Infallible;
    type Future = Ready<Result<RouterService, Infallible>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _: T) -> Self::Future {
        ok(self.0.clone())
    }
}

impl ServeMux {
    /// Converts the mux into a service factory for `hyper::Server`.
    ///
    /// ```rust,no_run
    /// use segmux::ServeMux;
    ///
    /// # async fn run() -> Result<(), hyper::Error> {
    /// let mut mux = ServeMux::new();
    /// // ... register routes ...
    ///
    /// hyper::Server::bind(&([127, 0, 0, 1], 3000).into())
    ///     .serve(mux.into_service())
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn into_service(self) -> MakeRouterService {
        MakeRouterService(RouterService(Arc::new(self)))
    }
}
