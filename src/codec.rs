//! Wire codec.
//!
//! Engine frames are one type digit followed by the payload. Socket packets
//! follow `type-digit [namespace ","] [ack-id] [data]`, which is not
//! self-delimiting: the boundaries are recovered positionally from the first
//! JSON marker (`[`, `{` or `"`) and the first comma. A comma only ends a
//! namespace when it comes before the JSON data; no attempt is made to
//! tokenize the JSON itself.

use crate::error::DecodeError;
use crate::models::{EnginePacket, NamespaceConnect, SocketPacket, SocketPayload};

/// Parses one complete wire frame into an engine packet.
pub fn decode_engine(wire: &str) -> Result<EnginePacket, DecodeError> {
    let first = wire.chars().next().ok_or(DecodeError::EmptyFrame)?;
    let digit = first
        .to_digit(10)
        .filter(|digit| *digit <= 6)
        .ok_or(DecodeError::InvalidEngineType(first))?;
    // the type digit is ASCII, so the payload starts at byte 1
    let payload = &wire[1..];

    match digit {
        0 => serde_json::from_str(payload)
            .map(EnginePacket::Open)
            .map_err(DecodeError::InvalidHandshake),
        1 => Ok(EnginePacket::Close),
        2 => Ok(EnginePacket::Ping(payload.to_string())),
        3 => Ok(EnginePacket::Pong(payload.to_string())),
        4 => decode_socket(payload).map(EnginePacket::Message),
        other => Err(DecodeError::UnsupportedEngineType(other as u8)),
    }
}

/// Parses the payload of a message engine packet into a socket packet.
pub fn decode_socket(payload: &str) -> Result<SocketPacket, DecodeError> {
    let type_char = payload.chars().next().ok_or(DecodeError::EmptyFrame)?;
    if !type_char.is_ascii_digit() {
        return Err(DecodeError::UnsupportedSocketType(type_char));
    }

    let payload_start = payload[1..]
        .find(|c: char| matches!(c, '[' | '{' | '"'))
        .map(|index| index + 1);
    // without a comma the namespace is empty and ends right after the type digit
    let nsp_end = payload[1..].find(',').map_or(1, |index| index + 1);

    // a comma past the first JSON marker belongs to the data
    let has_namespace = nsp_end > 1 && payload_start.map_or(true, |start| nsp_end < start);
    let namespace = if has_namespace {
        &payload[1..nsp_end]
    } else {
        ""
    };

    let ack_start = if has_namespace { nsp_end + 1 } else { 1 };
    let ack_end = payload_start.unwrap_or(payload.len());
    let ack_id = if ack_start < ack_end {
        parse_ack(&payload[ack_start..ack_end])?
    } else {
        None
    };

    let data = payload_start.map_or("", |start| &payload[start..]);

    let body = match type_char {
        '0' => {
            if data.len() > 1 {
                let record = serde_json::from_str::<NamespaceConnect>(data)
                    .map_err(DecodeError::InvalidConnect)?;
                SocketPayload::Connect(Some(record))
            } else {
                SocketPayload::Connect(None)
            }
        }
        '1' => SocketPayload::Disconnect,
        '2' => decode_event(data)?,
        '3' => SocketPayload::Ack,
        other => return Err(DecodeError::UnsupportedSocketType(other)),
    };

    Ok(SocketPacket {
        namespace: namespace.to_string(),
        ack_id,
        payload: body,
    })
}

/// Renders a packet into wire text.
pub fn encode(packet: &EnginePacket) -> String {
    packet.render()
}

fn parse_ack(span: &str) -> Result<Option<u64>, DecodeError> {
    if !span.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(DecodeError::InvalidAck(span.to_string()));
    }
    let ack_id: u64 = span
        .parse()
        .map_err(|_| DecodeError::InvalidAck(span.to_string()))?;
    // zero is the same as no ack
    Ok((ack_id > 0).then_some(ack_id))
}

/// Splits `["name", arg]` into its two halves, without a JSON parser.
fn decode_event(data: &str) -> Result<SocketPayload, DecodeError> {
    let inner = data
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| DecodeError::InvalidEvent(data.to_string()))?;
    let (name, arg) = inner
        .split_once(',')
        .ok_or_else(|| DecodeError::InvalidEvent(data.to_string()))?;

    Ok(SocketPayload::Event {
        name: unquote(name).to_string(),
        arg: unquote(arg).to_string(),
    })
}

fn unquote(part: &str) -> &str {
    part.trim().trim_matches('"')
}
