//! The handler abstraction routes dispatch to.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use nano_http::connection::Upgraded;
use nano_http::protocol::{Request, Response};

use crate::router::Route;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Produces the response for a matched request.
///
/// A view bound as [`ViewBinding::Shared`](crate::router::ViewBinding::Shared) is
/// called concurrently from every worker and must not assume exclusive access to
/// its own state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait View: Send + Sync {
    /// Builds the response. An error is logged and answered with a 500 page.
    async fn response(&self, req: &Request, route: &Route) -> Result<Response, BoxError>;

    /// Runs after `res` has been sent, with the raw streams of the connection.
    ///
    /// The connection is closed once this returns. Websocket views run their
    /// whole session here.
    async fn post_response(&self, req: &Request, res: &Response, upgraded: Upgraded) -> Result<(), BoxError> {
        let _ = (req, res, upgraded);
        Ok(())
    }
}

/// A [`View`] built from a synchronous closure.
pub struct FnView<F> {
    f: F,
}

impl<F> fmt::Debug for FnView<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnView").finish_non_exhaustive()
    }
}

/// Wraps `f` into a [`View`].
///
/// ```
/// use nano_http::protocol::Response;
/// use nano_web::view_fn;
///
/// let hello = view_fn(|req| Response::html(format!("hello {}", req.param("name").unwrap_or("world"))));
/// ```
pub fn view_fn<F>(f: F) -> FnView<F>
where
    F: Fn(&Request) -> Response + Send + Sync,
{
    FnView { f }
}

#[async_trait]
impl<F> View for FnView<F>
where
    F: Fn(&Request) -> Response + Send + Sync,
{
    async fn response(&self, req: &Request, _route: &Route) -> Result<Response, BoxError> {
        Ok((self.f)(req))
    }
}
