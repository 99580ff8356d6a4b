//! Core HTTP protocol types.
//!
//! - [`Request`]: an immutable, fully parsed request, built once per connection
//! - [`Response`]: a mutable response with an ordered header table
//! - [`Params`]: decoded query string and form body parameters
//! - [`Limits`]: byte ceilings applied while reading
//! - [`ErrorRenderer`]: the boundary used to render error pages
//! - [`ParseError`], [`SendError`]: error types

mod error;
pub use error::ParseError;
pub use error::SendError;
pub use error::StatusCodeError;

mod limits;
pub use limits::Limits;
pub use limits::{DEFAULT_MAX_FRAME_PAYLOAD, DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_MAX_POST_BYTES};

mod params;
pub use params::Params;

mod request;
pub use request::Request;
pub use request::RequestHead;

mod response;
pub use response::HeaderEntry;
pub use response::Response;
pub use response::reason_phrase;

mod error_page;
pub use error_page::DefaultErrorRenderer;
pub use error_page::ErrorPage;
pub use error_page::ErrorRenderer;
