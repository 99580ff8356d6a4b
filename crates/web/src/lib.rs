//! A small routing server on top of [`nano_http`].
//!
//! Each accepted connection carries exactly one request. It is served by one
//! of a fixed number of workers, routed to the first matching [`Route`], and
//! answered by that route's [`View`]. A view may keep the connection after its
//! response, which is how the websocket views in [`views`] run their sessions.
//!
//! ```no_run
//! use nano_http::protocol::{Request, Response};
//! use nano_web::views::DirectoryView;
//! use nano_web::{Route, Server, ViewBinding, view_fn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nano_web::ServerError> {
//!     let hello = view_fn(|req: &Request| Response::html(format!("hello {}", req.param("name").unwrap_or("world"))));
//!
//!     Server::builder()
//!         .address(([127, 0, 0, 1], 8080))
//!         .route(Route::exact("/", ViewBinding::shared(hello)))
//!         .route(Route::prefix("/static", ViewBinding::shared(DirectoryView::new("./public"))))
//!         .build()?
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

mod config;
mod dispatcher;
mod router;
mod server;
mod view;

pub mod views;

pub use config::{DEFAULT_PORT, DEFAULT_WORKERS, ServerConfig};
pub use dispatcher::Dispatcher;
pub use router::{MatchMode, Route, Router, ViewBinding};
pub use server::{RunningServer, Server, ServerBuilder, ServerError};
pub use view::{BoxError, FnView, View, view_fn};
