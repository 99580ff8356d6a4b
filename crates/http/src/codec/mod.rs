//! HTTP codec module for decoding requests and encoding responses.
//!
//! - [`RequestDecoder`]: decodes one complete request (head and optional body)
//! - [`ResponseEncoder`]: serializes a prepared response
//!
//! Both plug into `tokio_util::codec::{FramedRead, FramedWrite}`.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use nano_http::codec::{RequestDecoder, ResponseEncoder};
//! use nano_http::protocol::Response;
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut buffer = BytesMut::from("GET /hello?name=world HTTP/1.1\r\n\r\n");
//! let request = RequestDecoder::new().decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.param("name"), Some("world"));
//!
//! let mut response = Response::html("hello");
//! let mut out = BytesMut::new();
//! ResponseEncoder::new().encode(&mut response, &mut out).unwrap();
//! assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use header::HeaderDecoder;
pub use header::HeaderEncoder;
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
