//! Transport adapter.
//!
//! The duplex text transport is abstracted behind the `Connector`, `Sender`
//! and `Receiver` traits so the connection logic can run over WebSockets or
//! over in-memory mocks. This module also holds the two per-connection tasks:
//! the receive loop, which reassembles fragments and feeds complete frames to
//! the state machine, and the send loop, the single writer of outbound frames.

use crate::codec::encode;
use crate::config::ClientConfig;
use crate::error::{DecodeError, TransportError};
use crate::handlers::{
    handle_heartbeat_timeout, handle_transport_closed, handle_transport_error, handle_wire_text,
    Reaction,
};
use crate::models::EnginePacket;
use crate::state::{ConnectionState, Phase, SharedState};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;

/// Kind of frame a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
    Close,
}

/// One piece of a transport message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub data: Vec<u8>,
    /// Last fragment of the message.
    pub is_final: bool,
    pub kind: FrameKind,
}

impl Fragment {
    pub fn text(data: impl Into<Vec<u8>>, is_final: bool) -> Self {
        Fragment {
            data: data.into(),
            is_final,
            kind: FrameKind::Text,
        }
    }

    pub fn close() -> Self {
        Fragment {
            data: Vec::new(),
            is_final: true,
            kind: FrameKind::Close,
        }
    }
}

/// Trait for the sending half of a transport.
#[async_trait]
pub trait Sender: Send {
    /// Writes `data` as part of a text message; `is_final` ends the message.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Send` if the write fails.
    async fn send(&mut self, data: Vec<u8>, is_final: bool) -> Result<(), TransportError>;

    /// Closes the transport. Errors are not reported.
    async fn dispose(&mut self);
}

/// Trait for the receiving half of a transport.
#[async_trait]
pub trait Receiver: Send {
    /// Waits for the next fragment.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Receive` if the read fails.
    async fn receive_fragment(&mut self) -> Result<Fragment, TransportError>;
}

/// Trait for opening a transport to an address.
#[async_trait]
pub trait Connector: Send + Sync {
    type Sender: Sender + 'static;
    type Receiver: Receiver + 'static;

    /// Connects to `address` and returns the two halves of the transport.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Connect` if the connection cannot be made.
    async fn connect(&self, address: &str)
        -> Result<(Self::Sender, Self::Receiver), TransportError>;
}

/// Default limit on the size of one reassembled message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 << 20;

/// Complete message produced by the `FrameAssembler`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(Vec<u8>),
    Binary(Vec<u8>),
    Close,
    /// A message over the size limit was discarded; holds its total size.
    Oversized(usize),
}

/// Accumulates fragments until a message is complete.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    limit: usize,
    /// Bytes of the current message dropped after it crossed `limit`.
    discarded: usize,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        FrameAssembler::new(DEFAULT_MAX_MESSAGE_SIZE)
    }
}

impl FrameAssembler {
    /// Creates an assembler that refuses messages larger than `limit` bytes.
    pub fn new(limit: usize) -> Self {
        FrameAssembler {
            buffer: Vec::new(),
            limit,
            discarded: 0,
        }
    }

    /// Adds a fragment, returning the whole message once its final fragment
    /// arrives. A close fragment discards any partial message.
    ///
    /// # Returns
    ///
    /// `None` while the message is incomplete, `Frame::Oversized` once the
    /// final fragment of a message over the limit arrives.
    pub fn push(&mut self, fragment: Fragment) -> Option<Frame> {
        if fragment.kind == FrameKind::Close {
            self.buffer.clear();
            self.discarded = 0;
            return Some(Frame::Close);
        }
        let size = self.buffer.len().saturating_add(fragment.data.len());
        if self.discarded > 0 || size > self.limit {
            self.discarded = self.discarded.saturating_add(size);
            self.buffer = Vec::new();
            if !fragment.is_final {
                return None;
            }
            return Some(Frame::Oversized(std::mem::take(&mut self.discarded)));
        }
        self.buffer.extend_from_slice(&fragment.data);
        if !fragment.is_final {
            return None;
        }
        let data = std::mem::take(&mut self.buffer);
        match fragment.kind {
            FrameKind::Binary => Some(Frame::Binary(data)),
            _ => Some(Frame::Text(data)),
        }
    }
}

/// Reads frames until the connection leaves the open phase.
pub(crate) async fn receive_loop<R: Receiver>(
    mut receiver: R,
    state: SharedState,
    config: ClientConfig,
    outbound: mpsc::Sender<EnginePacket>,
    shutdown: Arc<Notify>,
) {
    let id = state.lock().id;
    debug!("[{}] Entering receive loop", id);
    let mut assembler = FrameAssembler::new(config.max_message_size);

    loop {
        let window = {
            let state = state.lock();
            if state.phase() != Phase::Open {
                break;
            }
            liveness_window(&config, &state)
        };

        let received = match window {
            Some(window) => match tokio::time::timeout(window, receiver.receive_fragment()).await {
                Ok(received) => received,
                Err(_) => {
                    let reaction = handle_heartbeat_timeout(&mut state.lock());
                    apply_reaction(reaction, &outbound).await;
                    break;
                }
            },
            None => receiver.receive_fragment().await,
        };

        let fragment = match received {
            Ok(fragment) => fragment,
            Err(e) => {
                handle_transport_error(&mut state.lock(), &e);
                break;
            }
        };

        let reaction = match assembler.push(fragment) {
            None => continue,
            Some(Frame::Close) => {
                handle_transport_closed(&mut state.lock());
                break;
            }
            Some(Frame::Binary(data)) => {
                state
                    .lock()
                    .warning(format!("Dropping binary frame of {} bytes", data.len()));
                continue;
            }
            Some(Frame::Oversized(size)) => {
                state.lock().error(format!(
                    "Dropping message of {} bytes, limit is {}",
                    size, config.max_message_size
                ));
                continue;
            }
            Some(Frame::Text(data)) => match String::from_utf8(data) {
                Ok(text) => handle_wire_text(&mut state.lock(), &config, &text),
                Err(_) => {
                    state.lock().error(DecodeError::InvalidUtf8.to_string());
                    continue;
                }
            },
        };

        if !apply_reaction(reaction, &outbound).await {
            break;
        }
    }

    debug!("[{}] Exited receive loop", id);
    state.lock().set_phase(Phase::Closed);
    shutdown.notify_one();
}

/// Queues the replies of a reaction. Returns `false` when the loop must stop.
async fn apply_reaction(reaction: Reaction, outbound: &mpsc::Sender<EnginePacket>) -> bool {
    for packet in reaction.replies {
        if outbound.send(packet).await.is_err() {
            return false;
        }
    }
    !reaction.dispose
}

fn liveness_window(config: &ClientConfig, state: &ConnectionState) -> Option<Duration> {
    if !config.heartbeat {
        return None;
    }
    // server-supplied values, the sum saturates
    state.handshake().map(|handshake| {
        Duration::from_millis(handshake.ping_interval_ms)
            .saturating_add(Duration::from_millis(handshake.ping_timeout_ms))
    })
}

/// Writes queued packets as complete text frames, then disposes the transport.
pub(crate) async fn send_loop<S: Sender>(
    mut sender: S,
    mut outbound: mpsc::Receiver<EnginePacket>,
    state: SharedState,
    shutdown: Arc<Notify>,
) {
    let id = state.lock().id;
    debug!("[{}] Entering send loop", id);

    loop {
        let packet = tokio::select! {
            biased;
            // queued packets go out before a shutdown is honoured
            packet = outbound.recv() => match packet {
                Some(packet) => packet,
                None => break,
            },
            _ = shutdown.notified() => break,
        };

        let wire = encode(&packet);
        debug!("[{}] Sending frame: {}", id, wire);
        if let Err(e) = sender.send(wire.into_bytes(), true).await {
            handle_transport_error(&mut state.lock(), &e);
            break;
        }
    }

    state.lock().set_phase(Phase::Closed);
    sender.dispose().await;
    debug!("[{}] Transport disposed", id);
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Connector for `ws://` and `wss://` addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

/// Sending half of a WebSocket connection.
pub struct WebSocketSender {
    sink: futures::stream::SplitSink<WsStream, WsMessage>,
    pending: Vec<u8>,
}

/// Receiving half of a WebSocket connection.
pub struct WebSocketReceiver(futures::stream::SplitStream<WsStream>);

#[async_trait]
impl Connector for WebSocketConnector {
    type Sender = WebSocketSender;
    type Receiver = WebSocketReceiver;

    async fn connect(
        &self,
        address: &str,
    ) -> Result<(WebSocketSender, WebSocketReceiver), TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(address)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (sink, stream) = stream.split();
        Ok((
            WebSocketSender {
                sink,
                pending: Vec::new(),
            },
            WebSocketReceiver(stream),
        ))
    }
}

#[async_trait]
impl Sender for WebSocketSender {
    async fn send(&mut self, data: Vec<u8>, is_final: bool) -> Result<(), TransportError> {
        self.pending.extend_from_slice(&data);
        if !is_final {
            return Ok(());
        }
        let text = String::from_utf8(std::mem::take(&mut self.pending))
            .map_err(|e| TransportError::Send(e.to_string()))?;
        self.sink
            .send(WsMessage::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn dispose(&mut self) {
        if let Err(e) = self.sink.close().await {
            debug!("Error while closing WebSocket: {}", e);
        }
    }
}

#[async_trait]
impl Receiver for WebSocketReceiver {
    async fn receive_fragment(&mut self) -> Result<Fragment, TransportError> {
        loop {
            match self.0.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(Fragment::text(text, true)),
                Some(Ok(WsMessage::Binary(data))) => {
                    return Ok(Fragment {
                        data,
                        is_final: true,
                        kind: FrameKind::Binary,
                    })
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!("Received close frame: {:?}", frame);
                    return Ok(Fragment::close());
                }
                // control frames are answered by tungstenite itself
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => continue,
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
                None => return Ok(Fragment::close()),
            }
        }
    }
}
