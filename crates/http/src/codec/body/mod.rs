//! Request body decoding.
//!
//! Only `Content-Length` delimited bodies are supported; the connection is
//! closed after each response, so chunked transfer coding is never negotiated.

mod length_decoder;

pub use length_decoder::LengthDecoder;
