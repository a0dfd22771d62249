use crate::error::TransportError;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tokio_tungstenite::tungstenite::http::Uri;

/// Path and query used when the address names only a host.
const DEFAULT_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Turns a server address into the WebSocket URL to dial.
///
/// HTTP schemes become WebSocket schemes. A bare host (empty or `/` path, no
/// query) gets the standard Socket.IO endpoint appended; anything else is
/// kept as given.
pub fn normalize_address(address: &str) -> Result<String, TransportError> {
    let address = if let Some(rest) = address.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = address.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        address.to_string()
    };

    let uri: Uri = address
        .parse()
        .map_err(|_| TransportError::InvalidAddress(address.clone()))?;
    let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) else {
        return Err(TransportError::InvalidAddress(address));
    };
    if scheme != "ws" && scheme != "wss" {
        return Err(TransportError::InvalidAddress(address));
    }

    if (uri.path().is_empty() || uri.path() == "/") && uri.query().is_none() {
        Ok(format!("{scheme}://{authority}{DEFAULT_PATH}"))
    } else {
        Ok(address)
    }
}
