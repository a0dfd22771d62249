//! Packet model for the two protocol layers.
//!
//! Engine packets are the outer framing unit carried by the transport. A
//! `Message` engine packet wraps a socket packet, the inner unit that carries
//! namespace membership, events and acknowledgements.

use serde::{Deserialize, Serialize};

/// Engine packet type, with the wire digit as discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineType {
    Open = 0,
    Close = 1,
    Ping = 2,
    Pong = 3,
    Message = 4,
}

impl EngineType {
    /// The ASCII digit written on the wire.
    pub fn digit(self) -> char {
        char::from(b'0' + self as u8)
    }
}

/// Socket packet type, with the wire digit as discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    Connect = 0,
    Disconnect = 1,
    Event = 2,
    Ack = 3,
}

impl SocketType {
    /// The ASCII digit written on the wire.
    pub fn digit(self) -> char {
        char::from(b'0' + self as u8)
    }
}

/// Session parameters sent by the server in the open packet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Engine session id.
    #[serde(rename = "sid")]
    pub session_id: String,
    /// Transports the session may be upgraded to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Interval between server pings, in milliseconds.
    #[serde(rename = "pingInterval")]
    pub ping_interval_ms: u64,
    /// Time the server waits for a pong, in milliseconds.
    #[serde(rename = "pingTimeout")]
    pub ping_timeout_ms: u64,
}

/// JSON record carried by a namespace connect packet.
///
/// The server fills `session_id` when it grants access; the client fills
/// `token` when it asks for access.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceConnect {
    /// Socket session id for the namespace.
    #[serde(rename = "sid", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Application auth token.
    #[serde(rename = "Token", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Outer framing packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// Handshake sent by the server once the transport is up.
    Open(Handshake),
    /// Session close.
    Close,
    /// Keepalive probe with an echo token.
    Ping(String),
    /// Keepalive reply echoing the ping token.
    Pong(String),
    /// Carrier for a socket packet.
    Message(SocketPacket),
}

impl EnginePacket {
    pub fn engine_type(&self) -> EngineType {
        match self {
            EnginePacket::Open(_) => EngineType::Open,
            EnginePacket::Close => EngineType::Close,
            EnginePacket::Ping(_) => EngineType::Ping,
            EnginePacket::Pong(_) => EngineType::Pong,
            EnginePacket::Message(_) => EngineType::Message,
        }
    }

    /// Renders the packet into its wire text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push(self.engine_type().digit());
        match self {
            EnginePacket::Open(handshake) => {
                out.push_str(&serde_json::to_string(handshake).unwrap_or_default());
            }
            EnginePacket::Close => {}
            EnginePacket::Ping(token) | EnginePacket::Pong(token) => out.push_str(token),
            EnginePacket::Message(packet) => out.push_str(&packet.render()),
        }
        out
    }
}

/// Body of a socket packet, one variant per socket type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketPayload {
    /// Namespace join request or grant. `None` when the packet had no JSON body.
    Connect(Option<NamespaceConnect>),
    /// Namespace leave or revocation.
    Disconnect,
    /// Named event with a single argument.
    Event { name: String, arg: String },
    /// Acknowledgement of the event carrying the same ack id.
    Ack,
}

/// Inner multiplexed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketPacket {
    /// Channel name, `""` for the root namespace.
    pub namespace: String,
    /// Acknowledgement id. Never `Some(0)`.
    pub ack_id: Option<u64>,
    pub payload: SocketPayload,
}

impl SocketPacket {
    pub fn new(namespace: impl Into<String>, payload: SocketPayload) -> Self {
        SocketPacket {
            namespace: namespace.into(),
            ack_id: None,
            payload,
        }
    }

    /// Namespace join request carrying an optional auth token.
    pub fn connect(namespace: impl Into<String>, token: Option<String>) -> Self {
        let record = token.map(|token| NamespaceConnect {
            session_id: None,
            token: Some(token),
        });
        SocketPacket::new(namespace, SocketPayload::Connect(record))
    }

    pub fn disconnect(namespace: impl Into<String>) -> Self {
        SocketPacket::new(namespace, SocketPayload::Disconnect)
    }

    pub fn event(
        namespace: impl Into<String>,
        name: impl Into<String>,
        arg: impl Into<String>,
    ) -> Self {
        SocketPacket::new(
            namespace,
            SocketPayload::Event {
                name: name.into(),
                arg: arg.into(),
            },
        )
    }

    /// Acknowledgement for the event that carried `ack_id`.
    pub fn ack(namespace: impl Into<String>, ack_id: u64) -> Self {
        SocketPacket::new(namespace, SocketPayload::Ack).with_ack(ack_id)
    }

    /// Stamps an ack id on the packet; `0` clears it.
    pub fn with_ack(mut self, ack_id: u64) -> Self {
        self.ack_id = (ack_id > 0).then_some(ack_id);
        self
    }

    pub fn socket_type(&self) -> SocketType {
        match self.payload {
            SocketPayload::Connect(_) => SocketType::Connect,
            SocketPayload::Disconnect => SocketType::Disconnect,
            SocketPayload::Event { .. } => SocketType::Event,
            SocketPayload::Ack => SocketType::Ack,
        }
    }

    /// Whether the packet targets the root namespace (`""` or `"/"`).
    pub fn is_root_namespace(&self) -> bool {
        is_root_namespace(&self.namespace)
    }

    /// The event name and argument, for event packets.
    pub fn event_data(&self) -> Option<(&str, &str)> {
        match &self.payload {
            SocketPayload::Event { name, arg } => Some((name, arg)),
            _ => None,
        }
    }

    /// The raw data section as it appears on the wire.
    pub fn data(&self) -> String {
        match &self.payload {
            SocketPayload::Connect(Some(record)) => {
                serde_json::to_string(record).unwrap_or_default()
            }
            SocketPayload::Connect(None) | SocketPayload::Disconnect | SocketPayload::Ack => {
                String::new()
            }
            SocketPayload::Event { name, arg } => format!("[\"{name}\",\"{arg}\"]"),
        }
    }

    /// Renders the packet as `type [namespace ","] [ack] [data]`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push(self.socket_type().digit());
        if !self.namespace.is_empty() {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(ack_id) = self.ack_id.filter(|id| *id > 0) {
            out.push_str(&ack_id.to_string());
        }
        out.push_str(&self.data());
        out
    }
}

/// Whether `namespace` names the root channel.
pub fn is_root_namespace(namespace: &str) -> bool {
    namespace.is_empty() || namespace == "/"
}

/// Namespace as shown to humans: the root channel is `/`.
pub fn display_namespace(namespace: &str) -> &str {
    if namespace.is_empty() {
        "/"
    } else {
        namespace
    }
}
