//! Connection state machine.
//!
//! Each inbound frame is decoded and applied to the `ConnectionState`. The
//! handlers never touch the transport themselves: they return a `Reaction`
//! listing the packets to send and whether the transport must be disposed,
//! and the receive loop carries it out.

use crate::codec::decode_engine;
use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::models::{display_namespace, EnginePacket, Handshake, SocketPacket, SocketPayload};
use crate::state::{ConnectionState, DomainEvent, Phase};
use tracing::debug;

/// Name of the domain event queued when the session opens.
pub const CONNECT_EVENT: &str = "connect";

/// Name of the domain event queued when the session ends.
pub const DISCONNECT_EVENT: &str = "disconnect";

/// Side effects requested by the state machine.
#[derive(Debug, Default, PartialEq)]
pub struct Reaction {
    /// Packets to send, in order.
    pub replies: Vec<EnginePacket>,
    /// The transport must be disposed.
    pub dispose: bool,
}

impl Reaction {
    fn reply(packet: EnginePacket) -> Self {
        Reaction {
            replies: vec![packet],
            dispose: false,
        }
    }

    fn dispose() -> Self {
        Reaction {
            replies: Vec::new(),
            dispose: true,
        }
    }
}

/// Entry point for one complete text frame.
///
/// Decode failures are logged and the frame is dropped; they never change the
/// phase. Frames arriving after the connection closed are ignored.
///
/// # Arguments
///
/// * `state` - The connection the frame arrived on.
/// * `config` - Client configuration, used for the join token.
/// * `text` - The frame text.
///
/// # Returns
///
/// Returns the `Reaction` the receive loop must carry out.
pub fn handle_wire_text(
    state: &mut ConnectionState,
    config: &ClientConfig,
    text: &str,
) -> Reaction {
    if state.phase() == Phase::Closed {
        debug!("[{}] Ignoring frame on closed connection: {}", state.id, text);
        return Reaction::default();
    }
    debug!("[{}] Received frame: {}", state.id, text);

    match decode_engine(text) {
        Ok(packet) => handle_packet(state, config, packet),
        Err(e) => {
            state.error(format!("Failed to decode frame {text:?}: {e}"));
            Reaction::default()
        }
    }
}

/// Applies one decoded engine packet.
///
/// # Arguments
///
/// * `state` - The connection the packet arrived on.
/// * `config` - Client configuration.
/// * `packet` - The decoded packet.
///
/// # Returns
///
/// Returns the packets to send in reply and whether the transport must be
/// disposed.
pub fn handle_packet(
    state: &mut ConnectionState,
    config: &ClientConfig,
    packet: EnginePacket,
) -> Reaction {
    match packet {
        EnginePacket::Open(handshake) => handle_open(state, config, handshake),
        EnginePacket::Close => handle_disconnected(state),
        EnginePacket::Ping(token) => handle_ping(state, token),
        EnginePacket::Pong(token) => {
            state.warning(format!("Unexpected pong {token:?}"));
            Reaction::default()
        }
        EnginePacket::Message(packet) => handle_socket_packet(state, packet),
    }
}

fn handle_open(
    state: &mut ConnectionState,
    config: &ClientConfig,
    handshake: Handshake,
) -> Reaction {
    state.info(format!(
        "Connected to server, session {} (ping interval {} ms, timeout {} ms)",
        handshake.session_id, handshake.ping_interval_ms, handshake.ping_timeout_ms
    ));
    state.set_phase(Phase::Open);
    state.store_handshake(handshake);
    state.enqueue_event(DomainEvent::new("", CONNECT_EVENT, ""));

    Reaction::reply(EnginePacket::Message(SocketPacket::connect(
        "",
        config.auth_token.clone(),
    )))
}

fn handle_ping(state: &mut ConnectionState, token: String) -> Reaction {
    state.info("Received ping");
    Reaction::reply(EnginePacket::Pong(token))
}

/// Remote end of the session: engine close or root namespace disconnect.
fn handle_disconnected(state: &mut ConnectionState) -> Reaction {
    state.info("Disconnected from server");
    state.enqueue_event(DomainEvent::new("", DISCONNECT_EVENT, ""));
    state.set_phase(Phase::Closed);
    Reaction::dispose()
}

fn handle_socket_packet(state: &mut ConnectionState, packet: SocketPacket) -> Reaction {
    debug!("[{}] Handling socket packet: {:?}", state.id, packet);
    match packet.payload {
        SocketPayload::Connect(_) => {
            state.info(format!(
                "Now accessing namespace {}",
                display_namespace(&packet.namespace)
            ));
            Reaction::default()
        }
        SocketPayload::Disconnect => {
            state.info(format!(
                "Lost access to namespace {}",
                display_namespace(&packet.namespace)
            ));
            if packet.is_root_namespace() {
                handle_disconnected(state)
            } else {
                Reaction::default()
            }
        }
        SocketPayload::Event { name, arg } => {
            let mut reaction = Reaction::default();
            if let Some(ack_id) = packet.ack_id.filter(|id| *id > 0) {
                reaction.replies.push(EnginePacket::Message(SocketPacket::ack(
                    packet.namespace.clone(),
                    ack_id,
                )));
            }
            state.enqueue_event(DomainEvent::new(packet.namespace, name, arg));
            reaction
        }
        SocketPayload::Ack => {
            state.info(format!(
                "Received ack {} on namespace {}",
                packet.ack_id.unwrap_or_default(),
                display_namespace(&packet.namespace)
            ));
            Reaction::default()
        }
    }
}

/// The transport delivered a close frame or ended its stream.
pub fn handle_transport_closed(state: &mut ConnectionState) {
    if state.phase() != Phase::Closed {
        state.info("Transport closed");
        state.set_phase(Phase::Closed);
    }
}

/// A fatal transport failure.
pub fn handle_transport_error(state: &mut ConnectionState, error: &TransportError) {
    state.error(error.to_string());
    state.set_phase(Phase::Closed);
}

/// No frame arrived within the window advertised by the handshake.
pub fn handle_heartbeat_timeout(state: &mut ConnectionState) -> Reaction {
    state.error("Heartbeat timeout");
    handle_disconnected(state)
}
