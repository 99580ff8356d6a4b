//! Handling of a single connection: parse, route, respond, then hand the
//! streams to the view.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use http::StatusCode;
use nano_http::connection::HttpConnection;
use nano_http::protocol::{ErrorRenderer, Limits, Response};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::router::Router;

/// Serves one connection at a time against a fixed set of routes.
pub struct Dispatcher {
    router: Router,
    limits: Limits,
    error_renderer: Arc<dyn ErrorRenderer>,
}

impl Dispatcher {
    pub fn new(router: Router, limits: Limits, error_renderer: Arc<dyn ErrorRenderer>) -> Self {
        Self { router, limits, error_renderer }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Serves exactly one request on the connection.
    ///
    /// Every failure is logged here and answered with an error page when a
    /// response can still be sent. The streams are dropped, closing the
    /// connection, when this returns.
    pub async fn dispatch<R, W>(&self, reader: R, writer: W, shutdown: CancellationToken)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut connection = HttpConnection::new(reader, writer, self.limits);

        let request = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                debug!("shutdown while waiting for a request");
                return;
            }
            request = connection.read_request() => request,
        };

        let request = match request {
            Ok(request) => request,
            Err(e) => {
                warn!(cause = %e, "failed to parse request");
                self.send_error(&mut connection, StatusCode::INTERNAL_SERVER_ERROR).await;
                return;
            }
        };

        let Some(route) = self.router.find(request.path()) else {
            debug!(path = request.path(), "no route matched");
            self.send_error(&mut connection, StatusCode::NOT_FOUND).await;
            return;
        };
        debug!(path = request.path(), pattern = route.pattern(), "route matched");

        let view = match route.binding().resolve() {
            Ok(view) => view,
            Err(e) => {
                error!(cause = %e, "failed to construct view");
                self.send_error(&mut connection, StatusCode::INTERNAL_SERVER_ERROR).await;
                return;
            }
        };

        let mut response = match AssertUnwindSafe(view.response(&request, &route)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(cause = %e, path = request.path(), "view failed");
                self.send_error(&mut connection, StatusCode::INTERNAL_SERVER_ERROR).await;
                return;
            }
            Err(panic) => {
                error!(cause = panic_message(panic.as_ref()), path = request.path(), "view panicked");
                self.send_error(&mut connection, StatusCode::INTERNAL_SERVER_ERROR).await;
                return;
            }
        };

        if let Err(e) = connection.send_response(&mut response).await {
            error!(cause = %e, "failed to send response");
            return;
        }

        let upgraded = connection.into_upgraded(shutdown);
        if let Err(e) = view.post_response(&request, &response, upgraded).await {
            warn!(cause = %e, "post response failed");
        }
    }

    fn error_response(&self, status: StatusCode) -> Response {
        Response::error_with(self.error_renderer.as_ref(), status)
    }

    async fn send_error<R, W>(&self, connection: &mut HttpConnection<R, W>, status: StatusCode)
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut response = self.error_response(status);
        if let Err(e) = connection.send_response(&mut response).await {
            error!(cause = %e, status = status.as_u16(), "failed to send error response");
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").field("router", &self.router).field("limits", &self.limits).finish_non_exhaustive()
    }
}

/// Extracts the message of a caught panic.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{Route, ViewBinding};
    use crate::view::{MockView, view_fn};
    use indoc::indoc;
    use nano_http::protocol::{DefaultErrorRenderer, Request};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn dispatcher(routes: Vec<Route>) -> Dispatcher {
        let mut router = Router::new();
        for route in routes {
            router.add_route(Arc::new(route));
        }
        Dispatcher::new(router, Limits::default(), Arc::new(DefaultErrorRenderer))
    }

    async fn exchange(dispatcher: &Dispatcher, raw: &str) -> String {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (mut client_read, mut client_write) = tokio::io::split(client);

        client_write.write_all(raw.as_bytes()).await.unwrap();
        client_write.shutdown().await.unwrap();

        dispatcher.dispatch(server_read, server_write, CancellationToken::new()).await;

        let mut received = String::new();
        client_read.read_to_string(&mut received).await.unwrap();
        received
    }

    #[tokio::test]
    async fn routes_to_first_matching_view() {
        let dispatcher = dispatcher(vec![
            Route::exact("/hello", ViewBinding::shared(view_fn(|req: &Request| {
                Response::html(format!("hello {}", req.param("name").unwrap_or("nobody")))
            }))),
            Route::prefix("/", ViewBinding::shared(view_fn(|_: &Request| Response::html("fallback")))),
        ]);

        let received = exchange(&dispatcher, "GET /hello?name=nano HTTP/1.1\r\n\r\n").await;
        assert!(received.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(received.ends_with("\r\n\r\nhello nano"));

        let received = exchange(&dispatcher, "GET /other HTTP/1.1\r\n\r\n").await;
        assert!(received.ends_with("fallback"));
    }

    #[tokio::test]
    async fn unmatched_path_is_404() {
        let dispatcher = dispatcher(vec![Route::exact("/a", ViewBinding::shared(view_fn(|_: &Request| Response::new())))]);

        let received = exchange(&dispatcher, "GET /b HTTP/1.1\r\n\r\n").await;
        assert!(received.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[tokio::test]
    async fn malformed_request_never_reaches_view() {
        let mut view = MockView::new();
        view.expect_response().never();
        let dispatcher = dispatcher(vec![Route::prefix("/", ViewBinding::shared(view))]);

        let received = exchange(&dispatcher, "GET /a/../etc/passwd HTTP/1.1\r\n\r\n").await;
        assert!(received.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

        let oversized = format!("GET / HTTP/1.1\r\nX-Big: {}\r\n\r\n", "a".repeat(5000));
        let received = exchange(&dispatcher, &oversized).await;
        assert!(received.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert_eq!(received.matches("HTTP/1.1").count(), 1);

        let received = exchange(&dispatcher, "POST / HTTP/1.1\r\nContent-Length: 70000\r\n\r\n").await;
        assert!(received.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn view_error_and_panic_become_500() {
        let mut failing = MockView::new();
        failing.expect_response().times(1).returning(|_, _| Err("database down".into()));
        failing.expect_post_response().never();

        let mut panicking = MockView::new();
        panicking.expect_response().times(1).returning(|_, _| panic!("view exploded"));
        panicking.expect_post_response().never();

        let dispatcher = dispatcher(vec![
            Route::exact("/fail", ViewBinding::shared(failing)),
            Route::exact("/panic", ViewBinding::shared(panicking)),
        ]);

        let received = exchange(&dispatcher, "GET /fail HTTP/1.1\r\n\r\n").await;
        assert!(received.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

        let received = exchange(&dispatcher, "GET /panic HTTP/1.1\r\n\r\n").await;
        assert!(received.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert_eq!(received.matches("HTTP/1.1 ").count(), 1);
    }

    #[tokio::test]
    async fn factory_failure_becomes_500() {
        let dispatcher = dispatcher(vec![Route::prefix(
            "/",
            ViewBinding::factory(|| Err::<MockView, _>("cannot build".into())),
        )]);

        let received = exchange(&dispatcher, "GET / HTTP/1.1\r\n\r\n").await;
        assert!(received.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn post_response_receives_sent_response() {
        let mut view = MockView::new();
        view.expect_response().times(1).returning(|_, _| {
            let mut response = Response::html("created");
            response.set_status(201).unwrap();
            Ok(response)
        });
        view.expect_post_response()
            .times(1)
            .withf(|req, res, _| req.post("name") == Some("nano") && res.status() == StatusCode::CREATED)
            .returning(|_, _, _| Ok(()));

        let dispatcher = dispatcher(vec![Route::exact("/items", ViewBinding::shared(view))]);
        let raw = indoc! {r##"
            POST /items HTTP/1.1
            Content-Type: application/x-www-form-urlencoded
            Content-Length: 9

            name=nano"##};

        let received = exchange(&dispatcher, raw).await;
        assert!(received.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(received.contains("Connection: close\r\n"));
    }

    #[test]
    fn panic_messages() {
        let panic: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(panic.as_ref()), "static");
        let panic: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(panic.as_ref()), "owned");
        let panic: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(panic.as_ref()), "unknown panic");
    }
}
