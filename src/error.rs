//! Error types for the client.
//!
//! Decode errors describe a single bad frame and never end the connection.
//! Transport errors are fatal to the connection they occur on.

use thiserror::Error;

/// Errors produced while turning wire text into packets.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame carried no characters at all.
    #[error("empty frame")]
    EmptyFrame,

    /// The leading character is not an engine type digit in `0..=6`.
    #[error("invalid engine packet type: {0:?}")]
    InvalidEngineType(char),

    /// A reserved engine type digit (upgrade or noop) was received.
    #[error("unsupported engine packet type: {0}")]
    UnsupportedEngineType(u8),

    /// The open packet payload is not a valid handshake record.
    #[error("invalid handshake: {0}")]
    InvalidHandshake(#[source] serde_json::Error),

    /// The socket packet type is missing or outside `0..=3`.
    #[error("unsupported socket packet type: {0:?}")]
    UnsupportedSocketType(char),

    /// The span between the namespace and the payload is not a number.
    #[error("invalid ack id: {0:?}")]
    InvalidAck(String),

    /// The namespace connect payload is not a valid JSON record.
    #[error("invalid namespace connect payload: {0}")]
    InvalidConnect(#[source] serde_json::Error),

    /// The event payload is not a `[name, arg]` array.
    #[error("invalid event payload: {0:?}")]
    InvalidEvent(String),

    /// The reassembled frame is not UTF-8 text.
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors raised by the underlying duplex transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The address could not be parsed as a WebSocket URL.
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    /// Establishing the connection failed or timed out.
    #[error("failed to connect: {0}")]
    Connect(String),

    /// Writing a frame failed.
    #[error("failed to send: {0}")]
    Send(String),

    /// Reading a frame failed.
    #[error("failed to receive: {0}")]
    Receive(String),

    /// `connect` was called on a client that already left the opening phase.
    #[error("connection already started")]
    NotOpening,

    /// The connection is closed.
    #[error("connection closed")]
    Closed,
}
