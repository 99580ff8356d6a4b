//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};

use nano_http::protocol::Limits;
use serde::{Deserialize, Serialize};

use crate::server::ServerError;

/// Default number of worker tasks, which is also the number of connections
/// (including websocket sessions) served at the same time.
pub const DEFAULT_WORKERS: usize = 4;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Everything needed to start a [`Server`](crate::Server), apart from its routes.
///
/// Deserializable from any serde format; missing fields take their defaults:
///
/// ```
/// use nano_web::ServerConfig;
///
/// let config: ServerConfig = serde_urlencoded::from_str("address=0.0.0.0:9000&workers=8").unwrap();
/// assert_eq!(config.workers, 8);
/// assert_eq!(config.limits.max_header_bytes, 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub workers: usize,
    pub limits: Limits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            workers: DEFAULT_WORKERS,
            limits: Limits::default(),
        }
    }
}

impl ServerConfig {
    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.workers == 0 {
            return Err(ServerError::invalid_config("workers must be at least 1"));
        }

        let limits = [
            ("max_header_bytes", self.limits.max_header_bytes),
            ("max_post_bytes", self.limits.max_post_bytes),
            ("max_frame_payload", self.limits.max_frame_payload),
            ("max_message_size", self.limits.max_message_size),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(ServerError::invalid_config(format!("{name} must be greater than 0")));
        }
        Ok(())
    }
}
