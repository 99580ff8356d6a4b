//! Per-connection request/response handling.
//!
//! - [`HttpConnection`]: reads one request, writes one response
//! - [`Upgraded`]: the raw streams handed over after the response, used by
//!   websocket sessions

mod http_connection;

pub use http_connection::HttpConnection;
pub use http_connection::Upgraded;
pub use http_connection::UpgradedParts;
