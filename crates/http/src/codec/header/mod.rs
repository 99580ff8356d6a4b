//! Request head decoding and response head encoding.
//!
//! - [`HeaderDecoder`]: request line and header block, bounded by a byte ceiling
//! - [`HeaderEncoder`]: status line and ordered response headers

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
