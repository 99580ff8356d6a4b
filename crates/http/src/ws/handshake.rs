//! Websocket opening handshake, server side.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use http::{Method, StatusCode, header};
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::ensure;
use crate::protocol::{Request, Response};
use crate::ws::HandshakeError;

/// GUID appended to the client key before hashing.
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Version advertised when an upgrade is refused.
pub const SUPPORTED_VERSION: &str = "8";

/// Checks that `req` is a valid upgrade request and returns its `Sec-WebSocket-Key`.
pub fn verify(req: &Request) -> Result<&str, HandshakeError> {
    ensure!(req.method() == Method::GET, HandshakeError::MethodNotGet(req.method().to_string()));

    ensure!(
        req.header(header::UPGRADE.as_str()).is_some_and(|v| v.eq_ignore_ascii_case("websocket")),
        HandshakeError::NotWebSocket
    );

    ensure!(
        req.header(header::CONNECTION.as_str())
            .is_some_and(|v| v.split(',').any(|token| token.trim().eq_ignore_ascii_case("upgrade"))),
        HandshakeError::MissingConnectionUpgrade
    );

    let key = req.header(header::SEC_WEBSOCKET_KEY.as_str()).filter(|key| key.len() == 24).ok_or(HandshakeError::InvalidKey)?;

    ensure!(
        req.header(header::SEC_WEBSOCKET_VERSION.as_str())
            .and_then(|v| v.parse::<i64>().ok())
            .is_some_and(|v| (6..=13).contains(&v)),
        HandshakeError::UnsupportedVersion
    );

    Ok(key)
}

/// Computes the `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

/// Builds the handshake response: `101 Switching Protocols` when `req` is a
/// valid upgrade, otherwise `400 Bad Request` advertising the supported version.
pub fn response(req: &Request) -> Response {
    match verify(req) {
        Ok(key) => {
            let mut response = Response::empty();
            response.set_status_code(StatusCode::SWITCHING_PROTOCOLS);
            response.set_header("Upgrade", "websocket");
            response.set_header("Connection", "Upgrade");
            response.set_header("Sec-WebSocket-Accept", accept_key(key));
            response
        }
        Err(e) => {
            debug!(cause = %e, "refusing websocket upgrade");
            let mut response = Response::error(StatusCode::BAD_REQUEST);
            response.set_header("Sec-WebSocket-Version", SUPPORTED_VERSION);
            response
        }
    }
}
