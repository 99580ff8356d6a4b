//! The wire layer of a small embeddable HTTP/1.1 server with websocket support.
//!
//! Every connection carries exactly one request and one response, optionally
//! followed by a websocket session on the same streams. All reads are bounded
//! by the byte ceilings in [`protocol::Limits`].
//!
//! # Architecture
//!
//! - [`protocol`]: [`protocol::Request`], [`protocol::Response`], limits, errors
//!   and the error page renderer
//! - [`codec`]: `tokio_util` codecs for requests and responses
//! - [`connection`]: reads one request and writes one response over a stream pair
//! - [`ws`]: websocket handshake, frame codec and message reassembly
//!
//! # Example
//!
//! ```no_run
//! use nano_http::connection::HttpConnection;
//! use nano_http::protocol::{Limits, Response};
//! use tokio::net::TcpListener;
//! use tracing::{error, info};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     loop {
//!         let (stream, peer) = listener.accept().await?;
//!         tokio::spawn(async move {
//!             let (reader, writer) = stream.into_split();
//!             let mut connection = HttpConnection::new(reader, writer, Limits::default());
//!             let mut response = match connection.read_request().await {
//!                 Ok(request) => Response::html(format!("hello {}", request.path())),
//!                 Err(e) => {
//!                     error!(cause = %e, %peer, "bad request");
//!                     Response::error(http::StatusCode::INTERNAL_SERVER_ERROR)
//!                 }
//!             };
//!             if let Err(e) = connection.send_response(&mut response).await {
//!                 error!(cause = %e, "send response failed");
//!             }
//!             info!(%peer, "connection finished");
//!         });
//!     }
//! }
//! ```

pub mod codec;
pub mod connection;
pub mod protocol;
pub mod ws;

mod utils;
pub(crate) use utils::ensure;
