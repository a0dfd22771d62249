//! Configuration module for the client.
//!
//! This module defines the `ClientConfig` struct. It can be built in code or
//! deserialized from any serde source (e.g., a file or environment variables).

use crate::transport::DEFAULT_MAX_MESSAGE_SIZE;
use serde::Deserialize;
use std::time::Duration;

/// Client configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Token sent with the root namespace join request. `None` sends no body.
    pub auth_token: Option<String>,

    /// Maximum time to wait for the transport to connect.
    #[serde(deserialize_with = "crate::utils::deserialize_duration")]
    pub connect_timeout: Duration,

    /// Capacity of the outbound packet channel.
    pub outbound_capacity: usize,

    /// Largest reassembled message accepted from the server, in bytes.
    /// Larger messages are dropped and logged.
    pub max_message_size: usize,

    /// Close the connection when no frame arrives within the ping interval
    /// plus ping timeout advertised by the handshake.
    pub heartbeat: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            auth_token: None,
            connect_timeout: Duration::from_secs(10),
            outbound_capacity: 64,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            heartbeat: true,
        }
    }
}
